//! # Atelier Services
//!
//! Request/response glue around the feedback core: the order-ready notifier,
//! admin statistics and broadcast, the pricing model and price list, the
//! Gemini time estimator, and the location sender.

pub mod admin;
pub mod estimator;
pub mod location;
pub mod notifier;
pub mod pricing;

pub use admin::AdminService;
pub use estimator::AiEstimator;
pub use location::LocationService;
pub use notifier::{NotificationService, NotifyOutcome};
pub use pricing::{PriceBreakdown, calculate_min_price};
