//! Error types for the depth analytics service
//!
//! The analytics themselves are infallible; these cover the edges around
//! them: feeds, replay parsing, publishing and configuration.

use thiserror::Error;

/// Depth analytics errors
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Failed to parse feed data: {0}")]
    ParseError(String),

    #[error("Feed error: {0}")]
    FeedError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid selection: {0}")]
    SelectionError(String),

    #[error("Replay file error at line {line}: {reason}")]
    ReplayError { line: usize, reason: String },
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::ParseError(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for AnalyticsError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        AnalyticsError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for AnalyticsError {
    fn from(err: std::io::Error) -> Self {
        AnalyticsError::IpcError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
