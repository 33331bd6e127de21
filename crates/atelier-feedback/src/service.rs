//! The feedback scheduler — creates follow-up tasks, scans for due ones,
//! advances state on customer answers, and branches on the rating score.
//!
//! Not-found conditions (unknown chat, no matching task) are silent no-ops:
//! they are races between a stale client keyboard and server state. Delivery
//! failures during a scan leave the task due, so the next scan retries.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use atelier_channels::keyboards;
use atelier_channels::telegram::Messenger;
use atelier_core::error::Result;
use atelier_core::types::{Customer, FeedbackStatus};
use atelier_store::{AtelierDb, TaskPatch};

use crate::calendar::{
    FIRST_PROMPT_DELAY_HOURS, MAX_PICKUP_ATTEMPTS, RETRY_DELAY_HOURS, schedule_after_hours,
};

pub const CHECK_TEXT: &str =
    "👋 Привіт! Минуло кілька днів як ваше замовлення готове. Ви вже встигли його забрати?";
pub const NOT_YET_TEXT: &str = "Ой, ваші речі вже сумують за вами! 🧥 Чекаємо в робочий час.";
pub const RATING_PROMPT: &str = "Чудово! Як вам якість нашої роботи? Оцініть, будь ласка:";

const RATING_5_TEXT: &str = "Дякуємо! 😍 Ми дуже раді, що вам сподобалось!";
const RATING_5_REVIEW_TEXT: &str = "Будемо вдячні за відгук у Google Maps 👇";
const RATING_4_TEXT: &str = "Дякуємо! Ми будемо старатися ще краще. 🙌";
const RATING_LOW_TEXT: &str = "Нам дуже прикро. 😔 Власник зв'яжеться з вами найближчим часом.";

/// A recognized answer to the pickup check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupReply {
    PickedUp,
    NotYet,
}

impl PickupReply {
    /// Match the exact button texts; anything else is not a pickup answer.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            keyboards::PICKUP_YES => Some(PickupReply::PickedUp),
            keyboards::PICKUP_NO => Some(PickupReply::NotYet),
            _ => None,
        }
    }
}

/// The follow-up scheduler and state machine.
pub struct FeedbackService {
    db: Arc<AtelierDb>,
    messenger: Arc<dyn Messenger>,
    admin_chat_ids: Vec<String>,
    /// Review link offered after a five-star rating.
    review_url: Option<String>,
}

impl FeedbackService {
    pub fn new(
        db: Arc<AtelierDb>,
        messenger: Arc<dyn Messenger>,
        admin_chat_ids: Vec<String>,
        review_url: Option<String>,
    ) -> Self {
        Self {
            db,
            messenger,
            admin_chat_ids,
            review_url,
        }
    }

    /// Create a `Pending` follow-up for a customer, due 48 business-window
    /// hours from `now`. Any still-active task for the customer is cancelled
    /// first — a fresh order-ready event starts a fresh cycle.
    pub fn schedule_follow_up(&self, customer_id: i64, now: DateTime<Utc>) -> Result<()> {
        if let Some(active) = self
            .db
            .latest_task_for_customer(customer_id, FeedbackStatus::ACTIVE)?
        {
            self.db.update_task_if_status(
                active.id,
                FeedbackStatus::ACTIVE,
                &TaskPatch::status(FeedbackStatus::Cancelled),
            )?;
            tracing::info!(
                "♻️ Superseded active follow-up task {} for customer {customer_id}",
                active.id
            );
        }

        let scheduled_for = schedule_after_hours(now, FIRST_PROMPT_DELAY_HOURS);
        let task = self
            .db
            .create_task(customer_id, now, scheduled_for, FeedbackStatus::Pending)?;
        tracing::info!(
            "📅 Follow-up task {} scheduled for customer {customer_id} at {scheduled_for}",
            task.id
        );
        Ok(())
    }

    /// Process every due task: send the pickup prompt and move the task to
    /// `AskingPickup` with a retry slot 36 business-window hours out.
    /// Returns the number of prompts actually delivered.
    ///
    /// A failed send leaves the task untouched and due, so the next scan
    /// picks it up again. State only advances through the status-guarded
    /// update, so an overlapping scan may double-send but never
    /// double-advance.
    pub async fn process_due_tasks(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.db.due_tasks(now)?;
        let mut sent = 0;
        for task in due {
            let Some(customer) = self.db.customer_by_id(task.customer_id)? else {
                // Owner vanished — retire the task instead of retrying forever.
                self.db.update_task_if_status(
                    task.id,
                    &[task.status],
                    &TaskPatch::status(FeedbackStatus::Cancelled),
                )?;
                tracing::warn!(
                    "⚠️ Cancelled follow-up task {} | customer {} not found",
                    task.id,
                    task.customer_id
                );
                continue;
            };

            let delivered = self
                .messenger
                .send_message(
                    &customer.chat_id,
                    CHECK_TEXT,
                    Some(keyboards::pickup_keyboard()),
                    None,
                )
                .await;
            if !delivered {
                continue;
            }

            let advanced = self.db.update_task_if_status(
                task.id,
                &[task.status],
                &TaskPatch {
                    status: Some(FeedbackStatus::AskingPickup),
                    scheduled_for: Some(schedule_after_hours(now, RETRY_DELAY_HOURS)),
                    ..TaskPatch::default()
                },
            )?;
            if advanced {
                sent += 1;
            }
        }
        if sent > 0 {
            tracing::info!("🔔 Sent {sent} pickup prompt(s)");
        }
        Ok(sent)
    }

    /// Handle a tap on one of the two pickup buttons.
    pub async fn handle_pickup_response(
        &self,
        chat_id: &str,
        reply: PickupReply,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(customer) = self.db.customer_by_chat_id(chat_id)? else {
            return Ok(());
        };
        let Some(task) = self
            .db
            .latest_task_for_customer(customer.id, FeedbackStatus::ACTIVE)?
        else {
            // Stale or duplicate tap — the flow already finished.
            return Ok(());
        };

        match reply {
            PickupReply::NotYet => {
                let attempts = task.pickup_attempts + 1;
                if attempts >= MAX_PICKUP_ATTEMPTS {
                    // Give up gracefully; scheduled_for stays as it was.
                    self.db.update_task_if_status(
                        task.id,
                        &[task.status],
                        &TaskPatch {
                            status: Some(FeedbackStatus::Cancelled),
                            pickup_attempts: Some(attempts),
                            ..TaskPatch::default()
                        },
                    )?;
                    tracing::info!(
                        "🛑 Follow-up task {} cancelled after {attempts} attempts",
                        task.id
                    );
                } else {
                    self.db.update_task_if_status(
                        task.id,
                        &[task.status],
                        &TaskPatch {
                            status: Some(FeedbackStatus::AskingPickup),
                            scheduled_for: Some(schedule_after_hours(now, RETRY_DELAY_HOURS)),
                            pickup_attempts: Some(attempts),
                        },
                    )?;
                }
                self.messenger
                    .send_message(
                        chat_id,
                        NOT_YET_TEXT,
                        Some(keyboards::member_keyboard()),
                        None,
                    )
                    .await;
            }
            PickupReply::PickedUp => {
                self.db.update_task_if_status(
                    task.id,
                    &[task.status],
                    &TaskPatch::status(FeedbackStatus::Completed),
                )?;
                self.messenger
                    .send_message(
                        chat_id,
                        RATING_PROMPT,
                        Some(keyboards::rating_keyboard()),
                        None,
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Handle a 1–5 rating tap. Scores outside that range are the caller's
    /// problem; routing only forwards bare digits.
    pub async fn handle_rating(&self, chat_id: &str, score: u8) -> Result<()> {
        let Some(customer) = self.db.customer_by_chat_id(chat_id)? else {
            return Ok(());
        };
        if self
            .db
            .latest_task_for_customer(customer.id, &[FeedbackStatus::Completed])?
            .is_none()
        {
            // Rating with no completed pickup on record.
            return Ok(());
        }

        match score {
            5 => {
                if let Some(url) = &self.review_url {
                    self.messenger
                        .send_message(
                            chat_id,
                            RATING_5_REVIEW_TEXT,
                            Some(keyboards::inline_url_button("🗺️ Google Maps", url)),
                            None,
                        )
                        .await;
                }
                self.messenger
                    .send_message(
                        chat_id,
                        RATING_5_TEXT,
                        Some(keyboards::member_keyboard()),
                        None,
                    )
                    .await;
            }
            4 => {
                self.messenger
                    .send_message(
                        chat_id,
                        RATING_4_TEXT,
                        Some(keyboards::member_keyboard()),
                        None,
                    )
                    .await;
            }
            1..=3 => {
                self.messenger
                    .send_message(
                        chat_id,
                        RATING_LOW_TEXT,
                        Some(keyboards::member_keyboard()),
                        None,
                    )
                    .await;
                self.alert_admins(&customer, score).await;
            }
            _ => {}
        }
        Ok(())
    }

    /// Fan an alert out to every admin. Each send stands alone: one failure
    /// is logged and the loop moves on.
    async fn alert_admins(&self, customer: &Customer, score: u8) {
        let alert = format!(
            "🚨 ALARM: Negative Feedback! {} ({}) rated {score} stars.",
            customer.name, customer.phone
        );
        for admin_id in &self.admin_chat_ids {
            if !self.messenger.send_message(admin_id, &alert, None, None).await {
                tracing::warn!("⚠️ Admin alert not delivered | admin={admin_id}");
            }
        }
    }
}
