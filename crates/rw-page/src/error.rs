//! CLI error types.

use rw_behaviors::BehaviorError;
use rw_config::ConfigError;
use rw_dom::{ParseError, SelectorError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse page: {0}")]
    Page(#[from] ParseError),

    #[error("{0}")]
    Behavior(#[from] BehaviorError),

    #[error("Invalid selector in script: {0}")]
    Selector(#[from] SelectorError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("System clipboard unavailable: {0}")]
    Clipboard(#[from] arboard::Error),

    #[error("Script step {step}: {message}")]
    Script { step: usize, message: String },
}
