//! # Atelier Gateway
//!
//! The HTTP face of the bot: the Telegram webhook with text routing, the
//! internal order-ready trigger, the cron endpoint that drives the feedback
//! scheduler, and a health check.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
