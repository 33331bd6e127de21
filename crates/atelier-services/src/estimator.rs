//! AI time estimator — asks Gemini how long a described tailoring task
//! takes. Every failure path degrades to a safe fallback estimate.

use serde::Deserialize;
use serde_json::json;

use atelier_core::config::AiConfig;

const SYSTEM_PROMPT: &str = "You are an expert master tailor. A client will describe a garment \
repair or custom sewing task. Estimate the realistic time needed to complete this task in \
minutes. Reply ONLY in raw JSON format without markdown blocks. \
Format: {\"task_summary\": \"string\", \"estimated_minutes\": integer}.";

pub const AI_DISCLAIMER: &str =
    "\n\n_⚠️ Це попередня оцінка AI. Точну вартість майстер назве після огляду виробу._";

const FALLBACK_MINUTES: u32 = 60;
const FALLBACK_SUMMARY: &str = "Стандартна робота";

/// Parsed estimate; always carries a positive minute count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Estimate {
    pub task_summary: String,
    pub estimated_minutes: u32,
}

impl Estimate {
    fn fallback() -> Self {
        Self {
            task_summary: FALLBACK_SUMMARY.into(),
            estimated_minutes: FALLBACK_MINUTES,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEstimate {
    task_summary: Option<String>,
    estimated_minutes: Option<i64>,
}

/// Gemini-backed estimator.
pub struct AiEstimator {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AiEstimator {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.model.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Whether a model key is configured at all.
    pub fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Estimate the task described in `user_text`. Disabled estimator,
    /// transport errors, and malformed replies all yield the fallback.
    pub async fn analyze(&self, user_text: &str) -> Estimate {
        if !self.enabled() || user_text.is_empty() {
            return Estimate::fallback();
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = json!({
            "system_instruction": {"parts": [{"text": SYSTEM_PROMPT}]},
            "contents": [{"parts": [{"text": user_text}]}],
        });

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("⚠️ Gemini request failed: {e}");
                return Estimate::fallback();
            }
        };
        let payload: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("⚠️ Invalid Gemini response: {e}");
                return Estimate::fallback();
            }
        };

        let raw = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();
        parse_estimate(raw).unwrap_or_else(Estimate::fallback)
    }
}

/// Parse the model's raw JSON reply; `None` on anything malformed or a
/// non-positive minute count.
fn parse_estimate(raw: &str) -> Option<Estimate> {
    let parsed: RawEstimate = serde_json::from_str(raw.trim()).ok()?;
    let minutes = parsed.estimated_minutes?;
    if minutes <= 0 {
        return None;
    }
    let summary = parsed
        .task_summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_SUMMARY.into());
    Some(Estimate {
        task_summary: summary,
        estimated_minutes: minutes as u32,
    })
}
