//! Admin tools — statistics and broadcast fan-out.

use std::sync::Arc;

use atelier_channels::telegram::Messenger;
use atelier_core::error::Result;
use atelier_store::AtelierDb;

pub struct AdminService {
    db: Arc<AtelierDb>,
    messenger: Arc<dyn Messenger>,
}

/// Per-recipient tally of one broadcast run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

impl AdminService {
    pub fn new(db: Arc<AtelierDb>, messenger: Arc<dyn Messenger>) -> Self {
        Self { db, messenger }
    }

    pub async fn send_stats(&self, chat_id: &str) -> Result<()> {
        let count = self.db.customer_count()?;
        let message = format!(
            "📊 *Статистика бота*\n\n👥 Користувачів: *{count}*\n✅ Активних: {count}"
        );
        self.messenger
            .send_message(chat_id, &message, None, Some("Markdown"))
            .await;
        Ok(())
    }

    pub async fn send_broadcast_instructions(&self, chat_id: &str) {
        let message = "⚠️ *Панель керування розсилкою*\n\n\
            Щоб надіслати повідомлення ВСІМ користувачам, використайте команду `/broadcast` та ваш текст.\n\n\
            *Шаблони для копіювання:*\n\n\
            1️⃣ *Нові можливості:*\n\
            `/broadcast 🚀 Оновлення: Додали нові фічі! Напишіть /start, щоб оновити меню.`\n\n\
            2️⃣ *Терміново/Закриття:*\n\
            `/broadcast 🕒 Повідомлення: Сьогодні зачиняємось трохи раніше. Будь ласка, завітайте до 17:00!`";
        self.messenger
            .send_message(chat_id, message, None, Some("Markdown"))
            .await;
    }

    /// Send `text` to every registered chat. Empty text re-shows the
    /// instructions. Each send stands alone; failures only move the tally.
    pub async fn broadcast(&self, admin_chat_id: &str, text: &str) -> Result<BroadcastReport> {
        if text.trim().is_empty() {
            self.send_broadcast_instructions(admin_chat_id).await;
            return Ok(BroadcastReport { sent: 0, failed: 0 });
        }

        let mut report = BroadcastReport { sent: 0, failed: 0 };
        for chat_id in self.db.all_chat_ids()? {
            if self
                .messenger
                .send_message(&chat_id, text, None, Some("Markdown"))
                .await
            {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            "📢 Broadcast done | sent={} failed={}",
            report.sent,
            report.failed
        );
        let summary = format!(
            "✅ Broadcast complete. Sent to {} users. Failed/Blocked: {}.",
            report.sent, report.failed
        );
        self.messenger
            .send_message(admin_chat_id, &summary, None, None)
            .await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    /// Fails sends to chat ids listed in `failing`.
    struct SelectiveMessenger {
        sent: Mutex<Vec<(String, String)>>,
        failing: Vec<String>,
    }

    impl SelectiveMessenger {
        fn new(failing: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                failing,
            })
        }
    }

    #[async_trait]
    impl Messenger for SelectiveMessenger {
        async fn send_message(
            &self,
            chat_id: &str,
            text: &str,
            _keyboard: Option<Value>,
            _parse_mode: Option<&str>,
        ) -> bool {
            if self.failing.iter().any(|id| id == chat_id) {
                return false;
            }
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), text.to_string()));
            true
        }

        async fn send_location(&self, _c: &str, _a: f64, _b: f64) -> bool {
            true
        }

        async fn send_video(&self, _c: &str, _u: &str, _cap: Option<&str>) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_broadcast_tallies_failures_and_continues() {
        let db = Arc::new(AtelierDb::open_in_memory().unwrap());
        db.upsert_customer("+1", "A", "10").unwrap();
        db.upsert_customer("+2", "B", "20").unwrap();
        db.upsert_customer("+3", "C", "30").unwrap();
        let messenger = SelectiveMessenger::new(vec!["20".into()]);
        let admin = AdminService::new(db, messenger.clone());

        let report = admin.broadcast("42", "Привіт усім!").await.unwrap();
        assert_eq!(report, BroadcastReport { sent: 2, failed: 1 });

        // One failing recipient never blocks the rest or the summary.
        let sent = messenger.sent.lock().unwrap().clone();
        let recipients: Vec<&str> = sent.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(recipients, vec!["10", "30", "42"]);
        assert!(sent.last().unwrap().1.contains("Sent to 2"));
    }

    #[tokio::test]
    async fn test_empty_broadcast_shows_instructions() {
        let db = Arc::new(AtelierDb::open_in_memory().unwrap());
        db.upsert_customer("+1", "A", "10").unwrap();
        let messenger = SelectiveMessenger::new(vec![]);
        let admin = AdminService::new(db, messenger.clone());

        let report = admin.broadcast("42", "   ").await.unwrap();
        assert_eq!(report, BroadcastReport { sent: 0, failed: 0 });

        let sent = messenger.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "42");
        assert!(sent[0].1.contains("/broadcast"));
    }

    #[tokio::test]
    async fn test_stats_reports_user_count() {
        let db = Arc::new(AtelierDb::open_in_memory().unwrap());
        db.upsert_customer("+1", "A", "10").unwrap();
        db.upsert_customer("+2", "B", "20").unwrap();
        let messenger = SelectiveMessenger::new(vec![]);
        let admin = AdminService::new(db, messenger.clone());

        admin.send_stats("42").await.unwrap();
        let sent = messenger.sent.lock().unwrap().clone();
        assert!(sent[0].1.contains("*2*"));
    }
}
