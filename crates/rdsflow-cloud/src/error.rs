//! Cloud provider error types

use thiserror::Error;

/// Errors surfaced by a [`crate::RdsProvider`] implementation
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unreadable provider response: {0}")]
    Decode(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// True when the provider answered but the payload could not be read
    pub fn is_decode(&self) -> bool {
        matches!(self, CloudError::Decode(_) | CloudError::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
