//! # Atelier Core
//!
//! Shared foundation for the Atelier Bot workspace: configuration,
//! the error type, and the domain model (customers and feedback tasks).

pub mod config;
pub mod error;
pub mod types;

pub use config::AtelierConfig;
pub use error::{AtelierError, Result};
pub use types::{ConversationState, Customer, FeedbackStatus, FeedbackTask};
