//! # Atelier Bot
//!
//! Telegram automation bot for a tailoring atelier: links customers by phone
//! number, announces ready orders, follows up on pickups, collects ratings,
//! and gives the owners broadcast and statistics tools.
//!
//! Usage:
//!   atelier-bot                       # Start the gateway (default port 5000)
//!   atelier-bot --port 8080           # Custom port
//!   atelier-bot --config bot.toml     # Explicit config file

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use atelier_core::AtelierConfig;

#[derive(Parser)]
#[command(
    name = "atelier-bot",
    version,
    about = "🧵 Atelier Bot — order notifications, pickup follow-ups, ratings"
)]
struct Cli {
    /// Path to the config file (default: ~/.atelier/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gateway port override
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => AtelierConfig::load_from(path)?,
        None => AtelierConfig::load()?,
    };
    config.apply_env_overrides();
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    if config.telegram.bot_token.is_empty() {
        tracing::warn!("⚠️ No Telegram bot token configured — outbound sends will fail");
    }

    atelier_gateway::start(config).await
}
