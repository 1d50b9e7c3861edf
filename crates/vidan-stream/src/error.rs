//! Error types for report client operations

use thiserror::Error;

use crate::streaming::StreamError;

/// Result type alias for report client operations
pub type Result<T> = std::result::Result<T, ReportClientError>;

/// Errors that can occur while configuring or driving the report client
#[derive(Error, Debug)]
pub enum ReportClientError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Opening or reading the report stream failed
    #[error("Stream error: {0}")]
    StreamError(#[from] StreamError),

    /// The spawned session task panicked or was aborted
    #[error("Session task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

impl ReportClientError {
    /// Create a configuration error from any displayable message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}
