//! # Atelier Feedback
//!
//! The follow-up scheduler and its state machine. After an order-ready
//! notification the bot schedules a delayed "did you pick this up?" prompt,
//! retries it with weekend-aware rescheduling, bounds retries, and then
//! asks for a 1–5 rating, escalating low scores to the admins.
//!
//! ## State machine
//! ```text
//! Pending ──due scan, prompt sent──▶ AskingPickup
//!    │                                   │  "no" ×3 ──▶ Cancelled
//!    │                                   │  "yes"  ──▶ Completed ── rating
//!    └──owner unresolvable──▶ Cancelled  └  "no" <3 ──▶ AskingPickup (+36h)
//! ```

pub mod calendar;
pub mod service;

pub use calendar::{schedule_after_hours, shift_to_business_window};
pub use service::{FeedbackService, PickupReply};
