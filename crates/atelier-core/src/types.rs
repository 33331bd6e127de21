//! Domain types — customers and feedback follow-up tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of one feedback follow-up task.
///
/// `Pending → AskingPickup → {Completed | Cancelled}`; terminal states are
/// never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    Pending,
    AskingPickup,
    Completed,
    Cancelled,
}

impl FeedbackStatus {
    /// Statuses of a task that still awaits a pickup answer.
    pub const ACTIVE: &[FeedbackStatus] = &[FeedbackStatus::Pending, FeedbackStatus::AskingPickup];

    /// Stable token used in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::AskingPickup => "asking_pickup",
            FeedbackStatus::Completed => "completed",
            FeedbackStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "pending" => Some(FeedbackStatus::Pending),
            "asking_pickup" => Some(FeedbackStatus::AskingPickup),
            "completed" => Some(FeedbackStatus::Completed),
            "cancelled" => Some(FeedbackStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FeedbackStatus::Completed | FeedbackStatus::Cancelled)
    }
}

/// One outstanding or historical follow-up for one order/customer interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackTask {
    /// Row id, assigned at insert.
    pub id: i64,
    /// Owning customer's internal id (not their chat id).
    pub customer_id: i64,
    pub created_at: DateTime<Utc>,
    /// When the task becomes due. Advanced on each retry; meaningless once
    /// the status is terminal.
    pub scheduled_for: DateTime<Utc>,
    pub status: FeedbackStatus,
    /// Count of "not picked up yet" answers received so far.
    pub pickup_attempts: u32,
}

/// Per-conversation routing state, persisted per chat so it survives
/// restarts. Kept separate from the customer record: guests and admins have
/// conversations too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    /// The next free-text message is an AI price-estimate request.
    AwaitingEstimate,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::AwaitingEstimate => "awaiting_estimate",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "idle" => Some(ConversationState::Idle),
            "awaiting_estimate" => Some(ConversationState::AwaitingEstimate),
            _ => None,
        }
    }
}

/// A customer linked to the bot through their shared phone number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    /// `+`-prefixed phone number, unique.
    pub phone: String,
    pub name: String,
    /// Telegram chat id, unique.
    pub chat_id: String,
}
