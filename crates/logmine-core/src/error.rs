//! Error types for logmine core

use thiserror::Error;

/// Result type alias for logmine core operations
pub type LogmineResult<T> = Result<T, LogmineError>;

/// Main error type for logmine core
#[derive(Error, Debug, Clone)]
pub enum LogmineError {
    /// Configuration related errors (unsupported URL scheme, missing backend config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required dataset artefact is absent from the description or registry
    #[error("Missing artefact: {0}")]
    MissingArtefact(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Network or persistence call exceeded its bound
    #[error("Operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Session storage backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl LogmineError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new missing-artefact error
    pub fn missing_artefact(message: impl Into<String>) -> Self {
        Self::MissingArtefact(message.into())
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a new timeout error
    pub const fn timeout(seconds: u64) -> Self {
        Self::Timeout { seconds }
    }
}

impl From<anyhow::Error> for LogmineError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(error.to_string())
    }
}

impl From<std::io::Error> for LogmineError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for LogmineError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}
