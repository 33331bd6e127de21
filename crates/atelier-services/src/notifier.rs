//! Order-ready notifier — delivers the "your order is ready" message and,
//! on success, hands the customer to the feedback scheduler.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use atelier_channels::telegram::Messenger;
use atelier_core::config::LocationConfig;
use atelier_core::error::Result;
use atelier_feedback::FeedbackService;
use atelier_store::AtelierDb;

/// Outcome of one order-ready notification, reported back to the caller of
/// the internal trigger API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    UserNotFound,
    DeliveryFailed,
}

impl NotifyOutcome {
    /// Status string for the trigger API response.
    pub fn as_status(&self) -> &'static str {
        match self {
            NotifyOutcome::Delivered => "Success",
            NotifyOutcome::UserNotFound => "Failed: User not found (Not subscribed to bot)",
            NotifyOutcome::DeliveryFailed => "Failed: Telegram API Error",
        }
    }
}

pub struct NotificationService {
    db: Arc<AtelierDb>,
    messenger: Arc<dyn Messenger>,
    feedback: Arc<FeedbackService>,
    schedule_text: String,
    contact_phone: String,
}

impl NotificationService {
    pub fn new(
        db: Arc<AtelierDb>,
        messenger: Arc<dyn Messenger>,
        feedback: Arc<FeedbackService>,
        location: &LocationConfig,
    ) -> Self {
        Self {
            db,
            messenger,
            feedback,
            schedule_text: location.schedule_text.clone(),
            contact_phone: location.contact_phone.clone(),
        }
    }

    fn order_ready_text(&self) -> String {
        format!(
            "🎉 *Ура! Ваше замовлення вже готове!*\n\n\
             Ми все підготували і чекаємо на вас.\n\n\
             🏃 *Забігайте, коли зручно!*\n\n\
             💡 _Порада:_ Плануєте візит на самий ранок або під закриття? \
             Краще наберіть нас заздалегідь, щоб ми точно не розминулися! 😉\n\n\
             📞 *{}*\n\n\
             {}",
            self.contact_phone, self.schedule_text
        )
    }

    /// Notify the customer behind `phone` that their order is ready. On a
    /// confirmed delivery the feedback follow-up cycle starts.
    pub async fn notify_order_ready(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<NotifyOutcome> {
        let Some(customer) = self.db.customer_by_phone(phone)? else {
            tracing::info!("📭 Order-ready notification skipped | no customer for {phone}");
            return Ok(NotifyOutcome::UserNotFound);
        };

        let delivered = self
            .messenger
            .send_message(
                &customer.chat_id,
                &self.order_ready_text(),
                None,
                Some("Markdown"),
            )
            .await;
        if !delivered {
            return Ok(NotifyOutcome::DeliveryFailed);
        }

        self.feedback.schedule_follow_up(customer.id, now)?;
        Ok(NotifyOutcome::Delivered)
    }
}
