//! SQLite-backed persistence for Atelier Bot.
//!
//! One database, two sections: the customer directory and the feedback task
//! store. Timestamps are stored as RFC 3339 text in UTC so string order
//! matches time order.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use atelier_core::error::{AtelierError, Result};

mod customers;
mod feedback_tasks;
mod sessions;

pub use feedback_tasks::TaskPatch;

/// The bot database — customers plus feedback follow-up tasks.
pub struct AtelierDb {
    conn: Mutex<Connection>,
}

impl AtelierDb {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| AtelierError::Store(format!("DB open: {e}")))?;

        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL;").ok();

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AtelierError::Store(format!("DB open: {e}")))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                phone TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL DEFAULT '',
                chat_id TEXT NOT NULL UNIQUE
            );

            -- Per-chat routing state; guests and admins have sessions too.
            CREATE TABLE IF NOT EXISTS sessions (
                chat_id TEXT PRIMARY KEY,
                state TEXT NOT NULL DEFAULT 'idle',
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS feedback_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id INTEGER NOT NULL REFERENCES customers(id),
                created_at TEXT NOT NULL,
                scheduled_for TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                pickup_attempts INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_feedback_due
                ON feedback_tasks(status, scheduled_for);
            CREATE INDEX IF NOT EXISTS idx_feedback_customer
                ON feedback_tasks(customer_id, created_at);
            ",
        )
        .map_err(|e| AtelierError::Store(format!("Migration: {e}")))?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AtelierError::Store(format!("Lock: {e}")))
    }
}

/// Format a timestamp for storage. Sub-second precision is dropped so every
/// stored value has the same width and text comparison stays correct.
pub(crate) fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp, tolerating garbage left by older versions.
pub(crate) fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            tracing::warn!("⚠️ Unparseable timestamp in store: {s}");
            Utc::now()
        })
}
