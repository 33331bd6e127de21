//! # Atelier Channels
//!
//! Messaging-platform plumbing: the Telegram Bot API adapter, the
//! `Messenger` seam the rest of the workspace talks through, and the
//! reply/inline keyboard builders.

pub mod keyboards;
pub mod telegram;

pub use telegram::{Messenger, TelegramAdapter, TelegramUpdate};
