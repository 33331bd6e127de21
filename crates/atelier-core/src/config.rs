//! Atelier Bot configuration system.
//!
//! TOML file with serde defaults, plus environment-variable overrides for
//! the values that deployments usually inject as secrets.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AtelierError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtelierConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

impl AtelierConfig {
    /// Load config from the default path (~/.atelier/config.toml), or the
    /// path named by `ATELIER_CONFIG`.
    pub fn load() -> Result<Self> {
        let path = std::env::var("ATELIER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AtelierError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AtelierError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AtelierError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Atelier home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".atelier")
    }

    /// Overlay secrets and deployment values from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Ok(v) = std::env::var("INTERNAL_API_KEY") {
            self.gateway.internal_api_key = v;
        }
        if let Ok(v) = std::env::var("CRON_SECRET") {
            self.gateway.cron_secret = v;
        }
        if let Ok(v) = std::env::var("ADMIN_IDS") {
            self.admin.chat_ids = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(v) = std::env::var("GEMINI_API_KEY") {
            self.ai.gemini_api_key = v;
        }
        if let Ok(v) = std::env::var("MAPS_URL") {
            self.links.maps_url = Some(v);
        }
        if let Ok(v) = std::env::var("INSTAGRAM_URL") {
            self.links.instagram_url = v;
        }
        if let Ok(v) = std::env::var("LOCATION_SCHEDULE_TEXT") {
            // Env vars carry newlines as the two-character escape.
            self.location.schedule_text = v.replace("\\n", "\n");
        }
        if let Ok(v) = std::env::var("ATELIER_DB") {
            self.storage.db_path = v;
        }
    }
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret for the internal order-ready trigger endpoint.
    #[serde(default)]
    pub internal_api_key: String,
    /// Shared secret for the cron-driven due-task endpoint.
    #[serde(default)]
    pub cron_secret: String,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    5000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            internal_api_key: String::new(),
            cron_secret: String::new(),
        }
    }
}

/// Database location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database; empty means `~/.atelier/atelier.db`.
    #[serde(default)]
    pub db_path: String,
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        if self.db_path.is_empty() {
            AtelierConfig::home_dir().join("atelier.db")
        } else {
            PathBuf::from(&self.db_path)
        }
    }
}

/// Admin access control.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Chat ids allowed to use the admin menu, stats, and broadcast.
    #[serde(default)]
    pub chat_ids: Vec<String>,
}

impl AdminConfig {
    pub fn is_admin(&self, chat_id: &str) -> bool {
        self.chat_ids.iter().any(|id| id == chat_id)
    }
}

/// Physical shop details sent to customers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Short clip showing the entrance.
    #[serde(default)]
    pub video_url: String,
    #[serde(default = "default_schedule_text")]
    pub schedule_text: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default = "default_support_username")]
    pub support_username: String,
}

fn default_schedule_text() -> String {
    "⏰ Наш графік:\n• Пн, Пт: 10:00 – 19:00\n• Вт - Чт: 10:00 – 17:00\n• Сб: 11:00 – 14:00 (за попереднім дзвінком)\n• Нд: Вихідний".into()
}
fn default_support_username() -> String {
    "@SupportHero".into()
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            video_url: String::new(),
            schedule_text: default_schedule_text(),
            contact_phone: String::new(),
            support_username: default_support_username(),
        }
    }
}

/// Outbound links shown in menus and after a five-star rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    #[serde(default = "default_instagram_url")]
    pub instagram_url: String,
    /// Review link offered after a five-star rating.
    #[serde(default)]
    pub maps_url: Option<String>,
}

fn default_instagram_url() -> String {
    "https://instagram.com/your-portfolio".into()
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            instagram_url: default_instagram_url(),
            maps_url: None,
        }
    }
}

/// Atelier economics for the minimum-price calculator (UAH).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_hourly_labor_rate")]
    pub hourly_labor_rate: f64,
    #[serde(default = "default_overhead_per_hour")]
    pub overhead_per_hour: f64,
    /// Fixed machine wear per order.
    #[serde(default = "default_depreciation_fee")]
    pub depreciation_fee: f64,
    /// Fixed consumables per order.
    #[serde(default = "default_consumables_fee")]
    pub consumables_fee: f64,
    /// Effective tax rate, e.g. 0.05 for 5%.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
}

fn default_hourly_labor_rate() -> f64 {
    156.0
}
fn default_overhead_per_hour() -> f64 {
    31.0
}
fn default_depreciation_fee() -> f64 {
    10.0
}
fn default_consumables_fee() -> f64 {
    15.0
}
fn default_tax_rate() -> f64 {
    0.05
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            hourly_labor_rate: default_hourly_labor_rate(),
            overhead_per_hour: default_overhead_per_hour(),
            depreciation_fee: default_depreciation_fee(),
            consumables_fee: default_consumables_fee(),
            tax_rate: default_tax_rate(),
        }
    }
}

/// Hosted-model settings for the time estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".into()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            model: default_gemini_model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AtelierConfig::default();
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 5000);
        assert!(config.telegram.bot_token.is_empty());
        assert_eq!(config.pricing.hourly_labor_rate, 156.0);
        assert_eq!(config.ai.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [telegram]
            bot_token = "123:abc"

            [gateway]
            port = 8080

            [admin]
            chat_ids = ["42", "43"]
        "#;
        let config: AtelierConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.telegram.bot_token, "123:abc");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert!(config.admin.is_admin("42"));
        assert!(!config.admin.is_admin("44"));
    }

    #[test]
    fn test_db_path_fallback() {
        let storage = StorageConfig::default();
        assert!(storage.db_path().ends_with("atelier.db"));
        let storage = StorageConfig {
            db_path: "/tmp/custom.db".into(),
        };
        assert_eq!(storage.db_path(), PathBuf::from("/tmp/custom.db"));
    }
}
