//! Error types for Feedhook.

use thiserror::Error;

/// Common error type for Feedhook.
#[derive(Error, Debug)]
pub enum FeedhookError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Feed could not be fetched or parsed.
    #[error("feed error: {0}")]
    Feed(String),

    /// Webhook delivery failed.
    #[error("webhook error: {0}")]
    Webhook(String),

    /// Upstream OAuth provider error.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// User store persistence error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for FeedhookError {
    fn from(e: serde_json::Error) -> Self {
        FeedhookError::Storage(e.to_string())
    }
}

/// Result type alias for Feedhook operations.
pub type Result<T> = std::result::Result<T, FeedhookError>;
