//! Open Telekom Cloud provider error types

use rdsflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OtcError {
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No '{service}' endpoint in the service catalog for region {region}")]
    EndpointNotFound { service: String, region: String },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unreadable response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl From<OtcError> for CloudError {
    fn from(err: OtcError) -> Self {
        match err {
            OtcError::MissingCredential(_) | OtcError::EndpointNotFound { .. } => {
                CloudError::InvalidConfig(err.to_string())
            }
            OtcError::AuthenticationFailed(message) => CloudError::AuthenticationFailed(message),
            OtcError::Api { status, message } => CloudError::Api { status, message },
            OtcError::Http(e) if e.is_decode() => CloudError::Decode(e.to_string()),
            OtcError::Http(e) => CloudError::Transport(e.to_string()),
            OtcError::Decode { .. } => CloudError::Decode(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OtcError>;
