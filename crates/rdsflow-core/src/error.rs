use crate::provision::ProvisionPhase;
use crate::resolver::ResourceKind;
use rdsflow_cloud::CloudError;
use rdsflow_config::ConfigError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing variable {name} (e.g. {example})")]
    MissingInput {
        name: &'static str,
        example: &'static str,
    },

    #[error("Can't parse time format '{value}': {reason}")]
    InvalidRestoreTime { value: String, reason: String },

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("No {kind} named '{name}'")]
    NotFound { kind: ResourceKind, name: String },

    #[error("{count} {kind}s are named '{name}'; refusing to pick one")]
    Ambiguous {
        kind: ResourceKind,
        name: String,
        count: usize,
    },

    #[error("Request rejected by the provider: {0}")]
    Submission(#[source] CloudError),

    #[error("Job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    #[error("Job {job_id} still not finished after {}s; it may still be running", .waited.as_secs())]
    Timeout { job_id: String, waited: Duration },

    #[error("Could not extract result: {0}")]
    Extraction(String),

    #[error("Provider error: {0}")]
    Provider(#[source] CloudError),
}

impl CoreError {
    /// Phase of the create/restore state machine this error ends in
    ///
    /// `None` for errors that can surface in any phase.
    pub fn phase(&self) -> Option<ProvisionPhase> {
        match self {
            CoreError::MissingInput { .. }
            | CoreError::InvalidRestoreTime { .. }
            | CoreError::InvalidConfig(_)
            | CoreError::NotFound { .. }
            | CoreError::Ambiguous { .. } => Some(ProvisionPhase::BuildingRequest),
            CoreError::Submission(_) => Some(ProvisionPhase::Submitted),
            CoreError::JobFailed { .. } => Some(ProvisionPhase::Failed),
            CoreError::Timeout { .. } => Some(ProvisionPhase::TimedOut),
            CoreError::Extraction(_) | CoreError::Provider(_) => None,
        }
    }

    /// True for errors detected from local input alone
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CoreError::MissingInput { .. }
                | CoreError::InvalidRestoreTime { .. }
                | CoreError::InvalidConfig(_)
        )
    }

    pub(crate) fn submission(err: CloudError) -> Self {
        match CoreError::from(err) {
            CoreError::Provider(err) => CoreError::Submission(err),
            other => other,
        }
    }
}

impl From<CloudError> for CoreError {
    fn from(err: CloudError) -> Self {
        if err.is_decode() {
            CoreError::Extraction(err.to_string())
        } else {
            CoreError::Provider(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
