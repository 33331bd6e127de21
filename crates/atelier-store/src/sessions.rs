//! Per-chat session state.
//!
//! The one piece of routing state the bot keeps between messages: whether
//! the next free-text message is an AI estimate request. Persisted so the
//! flow survives restarts and works for guests and admins alike.

use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use atelier_core::error::{AtelierError, Result};
use atelier_core::types::ConversationState;

use crate::{AtelierDb, ts};

impl AtelierDb {
    /// Routing state for a chat; `Idle` when none was ever recorded.
    pub fn conversation_state(&self, chat_id: &str) -> Result<ConversationState> {
        let conn = self.lock()?;
        let token: Option<String> = conn
            .query_row(
                "SELECT state FROM sessions WHERE chat_id = ?1",
                params![chat_id],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| AtelierError::Store(format!("Conversation state: {e}")))?;
        Ok(token
            .and_then(|t| ConversationState::parse(&t))
            .unwrap_or(ConversationState::Idle))
    }

    /// Persist the routing state for a chat.
    pub fn set_conversation_state(&self, chat_id: &str, state: ConversationState) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sessions (chat_id, state, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(chat_id) DO UPDATE SET state = ?2, updated_at = ?3",
            params![chat_id, state.as_str(), ts(Utc::now())],
        )
        .map_err(|e| AtelierError::Store(format!("Set conversation state: {e}")))?;
        Ok(())
    }
}
