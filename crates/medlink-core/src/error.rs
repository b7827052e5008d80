//! Error types shared across the workspace.

use thiserror::Error;

/// Errors produced by the core crate itself.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON or has the wrong shape.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),
}
