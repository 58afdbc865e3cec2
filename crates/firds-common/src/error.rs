//! Error types shared across the FIRDS workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, FirdsError>;

/// Errors raised by the shared helpers
#[derive(Error, Debug)]
pub enum FirdsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FirdsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}
