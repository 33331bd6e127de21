//! Telegram Bot API adapter — message sending via HTTPS.
//!
//! Public sends return a plain success boolean and log the outcome; callers
//! treat delivery failure as a recoverable condition, never an exception.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use atelier_core::error::{AtelierError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 5;

/// Outbound messaging seam. The scheduler and the services talk to this
/// trait so tests can substitute a recording double.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message, optionally with a `reply_markup` keyboard and a
    /// parse mode. Returns whether delivery succeeded.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<Value>,
        parse_mode: Option<&str>,
    ) -> bool;

    /// Send a geo location pin.
    async fn send_location(&self, chat_id: &str, latitude: f64, longitude: f64) -> bool;

    /// Send a video by URL.
    async fn send_video(&self, chat_id: &str, video_url: &str, caption: Option<&str>) -> bool;
}

/// Telegram Bot API client.
pub struct TelegramAdapter {
    api_base: String,
    client: reqwest::Client,
}

impl TelegramAdapter {
    pub fn new(bot_token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            api_base: format!("https://api.telegram.org/bot{bot_token}"),
            client,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// POST one Bot API method. Telegram returns HTTP 200 with `ok=false`
    /// for most errors, so both layers are checked.
    async fn call(&self, method: &str, payload: &Value) -> Result<()> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| AtelierError::Channel(format!("{method} request failed: {e}")))?;

        let status = response.status();
        let body: TelegramApiResponse<Value> = response
            .json()
            .await
            .map_err(|e| AtelierError::Channel(format!("Invalid {method} response: {e}")))?;

        if !status.is_success() || !body.ok {
            return Err(AtelierError::Channel(format!(
                "{method} failed: status={status} description={}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

/// Keep log lines short when echoing customer-facing text.
fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        format!("{}...", text.chars().take(limit).collect::<String>())
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Messenger for TelegramAdapter {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<Value>,
        parse_mode: Option<&str>,
    ) -> bool {
        let mut payload = json!({"chat_id": chat_id, "text": text});
        if let Some(mode) = parse_mode {
            payload["parse_mode"] = mode.into();
        }
        let keyboard_present = keyboard.is_some();
        if let Some(kb) = keyboard {
            payload["reply_markup"] = kb;
        }

        let snippet = truncate_text(text, 50);
        match self.call("sendMessage", &payload).await {
            Ok(()) => {
                tracing::info!(
                    "✅ Sent to {chat_id} | Text: \"{snippet}\" | Keyboard: {keyboard_present}"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    "❌ Telegram sendMessage failed | chat_id={chat_id} | text=\"{snippet}\" | keyboard={keyboard_present} | {e}"
                );
                // Markdown parse errors are usually the payload's fault;
                // retry once as plain text so the customer still hears back.
                if parse_mode.is_some() && e.to_string().to_lowercase().contains("parse") {
                    tracing::info!("Retrying sendMessage without parse_mode for chat_id={chat_id}");
                    if let Some(obj) = payload.as_object_mut() {
                        obj.remove("parse_mode");
                    }
                    if self.call("sendMessage", &payload).await.is_ok() {
                        tracing::info!(
                            "✅ Sent to {chat_id} | Text: \"{snippet}\" | Keyboard: {keyboard_present} | Retry: Yes"
                        );
                        return true;
                    }
                }
                false
            }
        }
    }

    async fn send_location(&self, chat_id: &str, latitude: f64, longitude: f64) -> bool {
        let payload = json!({"chat_id": chat_id, "latitude": latitude, "longitude": longitude});
        match self.call("sendLocation", &payload).await {
            Ok(()) => {
                tracing::info!("✅ Sent location to {chat_id} | Data: {latitude},{longitude}");
                true
            }
            Err(e) => {
                tracing::error!("❌ Failed to send location | chat_id={chat_id} | {e}");
                false
            }
        }
    }

    async fn send_video(&self, chat_id: &str, video_url: &str, caption: Option<&str>) -> bool {
        let mut payload = json!({"chat_id": chat_id, "video": video_url});
        if let Some(caption) = caption {
            payload["caption"] = caption.into();
        }
        match self.call("sendVideo", &payload).await {
            Ok(()) => {
                tracing::info!(
                    "✅ Sent video to {chat_id} | Url: \"{}\"",
                    truncate_text(video_url, 50)
                );
                true
            }
            Err(e) => {
                tracing::error!("❌ Failed to send video | chat_id={chat_id} | {e}");
                false
            }
        }
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// One webhook update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: Option<i64>,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub contact: Option<TelegramContact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Shared-contact payload from the "request_contact" button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramContact {
    pub phone_number: String,
    pub first_name: Option<String>,
}
