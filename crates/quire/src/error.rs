//! CLI error types.

use quire_config::ConfigError;
use quire_pages::PageError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("{0}")]
    Page(#[from] PageError),

    #[error("{0}")]
    Validation(String),
}
