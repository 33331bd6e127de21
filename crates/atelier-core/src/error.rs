//! Error types shared across the workspace.

use thiserror::Error;

/// Workspace-wide error type.
#[derive(Debug, Error)]
pub enum AtelierError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Pricing error: {0}")]
    Pricing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, AtelierError>;
