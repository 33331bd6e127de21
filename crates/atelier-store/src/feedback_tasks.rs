//! Feedback task store — durable records of scheduled follow-ups.
//!
//! Tasks are never deleted; terminal rows stay as history. All scheduler
//! transitions go through the status-guarded conditional update so two
//! overlapping scans cannot both advance the same task.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};

use atelier_core::error::{AtelierError, Result};
use atelier_core::types::{FeedbackStatus, FeedbackTask};

use crate::{AtelierDb, parse_ts, ts};

/// Partial update for a feedback task; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub status: Option<FeedbackStatus>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub pickup_attempts: Option<u32>,
}

impl TaskPatch {
    pub fn status(status: FeedbackStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

fn map_task(row: &Row<'_>) -> rusqlite::Result<FeedbackTask> {
    let created_at: String = row.get(2)?;
    let scheduled_for: String = row.get(3)?;
    let status_token: String = row.get(4)?;
    Ok(FeedbackTask {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        created_at: parse_ts(&created_at),
        scheduled_for: parse_ts(&scheduled_for),
        status: FeedbackStatus::parse(&status_token).unwrap_or(FeedbackStatus::Cancelled),
        pickup_attempts: row.get(5)?,
    })
}

const TASK_COLS: &str = "id, customer_id, created_at, scheduled_for, status, pickup_attempts";

/// Render a status set as a SQL IN-list. Status tokens are fixed internal
/// values, never user input.
fn status_in_list(statuses: &[FeedbackStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl AtelierDb {
    /// Insert a new follow-up task; `pickup_attempts` starts at 0.
    pub fn create_task(
        &self,
        customer_id: i64,
        created_at: DateTime<Utc>,
        scheduled_for: DateTime<Utc>,
        status: FeedbackStatus,
    ) -> Result<FeedbackTask> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO feedback_tasks (customer_id, created_at, scheduled_for, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![customer_id, ts(created_at), ts(scheduled_for), status.as_str()],
        )
        .map_err(|e| AtelierError::Store(format!("Create task: {e}")))?;
        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {TASK_COLS} FROM feedback_tasks WHERE id = ?1"),
            params![id],
            map_task,
        )
        .map_err(|e| AtelierError::Store(format!("Create task readback: {e}")))
    }

    /// Every active task whose scheduled time has arrived, earliest first so
    /// a backlog is processed in fair order.
    pub fn due_tasks(&self, now: DateTime<Utc>) -> Result<Vec<FeedbackTask>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {TASK_COLS} FROM feedback_tasks
             WHERE status IN ({}) AND scheduled_for <= ?1
             ORDER BY scheduled_for ASC",
            status_in_list(FeedbackStatus::ACTIVE),
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AtelierError::Store(format!("Due tasks: {e}")))?;
        let rows = stmt
            .query_map(params![ts(now)], map_task)
            .map_err(|e| AtelierError::Store(format!("Due tasks: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// The most recently created task for a customer, optionally restricted
    /// to a status set. An empty set means any status.
    pub fn latest_task_for_customer(
        &self,
        customer_id: i64,
        statuses: &[FeedbackStatus],
    ) -> Result<Option<FeedbackTask>> {
        let conn = self.lock()?;
        let filter = if statuses.is_empty() {
            String::new()
        } else {
            format!(" AND status IN ({})", status_in_list(statuses))
        };
        let sql = format!(
            "SELECT {TASK_COLS} FROM feedback_tasks
             WHERE customer_id = ?1{filter}
             ORDER BY created_at DESC, id DESC LIMIT 1",
        );
        conn.query_row(&sql, params![customer_id], map_task)
            .optional()
            .map_err(|e| AtelierError::Store(format!("Latest task: {e}")))
    }

    /// Partial update. Unknown ids are a no-op, not an error — the caller
    /// may be racing a concurrent scan.
    pub fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE feedback_tasks SET
                 status = COALESCE(?2, status),
                 scheduled_for = COALESCE(?3, scheduled_for),
                 pickup_attempts = COALESCE(?4, pickup_attempts)
             WHERE id = ?1",
            params![
                id,
                patch.status.map(|s| s.as_str()),
                patch.scheduled_for.map(ts),
                patch.pickup_attempts,
            ],
        )
        .map_err(|e| AtelierError::Store(format!("Update task: {e}")))?;
        Ok(())
    }

    /// Conditional update: applies the patch only while the task still has
    /// one of the expected statuses. Returns whether a row changed, so a
    /// scan that lost the race can tell.
    pub fn update_task_if_status(
        &self,
        id: i64,
        expected: &[FeedbackStatus],
        patch: &TaskPatch,
    ) -> Result<bool> {
        let conn = self.lock()?;
        let sql = format!(
            "UPDATE feedback_tasks SET
                 status = COALESCE(?2, status),
                 scheduled_for = COALESCE(?3, scheduled_for),
                 pickup_attempts = COALESCE(?4, pickup_attempts)
             WHERE id = ?1 AND status IN ({})",
            status_in_list(expected),
        );
        let changed = conn
            .execute(
                &sql,
                params![
                    id,
                    patch.status.map(|s| s.as_str()),
                    patch.scheduled_for.map(ts),
                    patch.pickup_attempts,
                ],
            )
            .map_err(|e| AtelierError::Store(format!("Conditional update: {e}")))?;
        Ok(changed > 0)
    }
}
