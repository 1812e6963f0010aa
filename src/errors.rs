//! Structured error types for responder-watch
//!
//! The tracking engine itself never fails. These errors only cover the
//! boundary: decoding inbound lines, sockets, config and replay files.

use thiserror::Error;

/// All possible boundary errors in responder-watch
#[derive(Error, Debug)]
pub enum WatchError {
    /// Inbound line decoded but carried unusable content
    #[error("Invalid inbound item: {0}")]
    InvalidInbound(&'static str),

    /// File or socket I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("Config error in {path}: {reason}")]
    ConfigError { path: String, reason: String },

    /// Replay capture could not be read
    #[error("Replay error at line {line}: {reason}")]
    ReplayError { line: usize, reason: String },
}

/// Convenience Result type using WatchError
pub type Result<T> = std::result::Result<T, WatchError>;

impl From<&'static str> for WatchError {
    fn from(s: &'static str) -> Self {
        WatchError::InvalidInbound(s)
    }
}
