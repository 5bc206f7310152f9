//! Deadline-bounded polling of asynchronous provider jobs

use crate::error::CoreError;
use rdsflow_cloud::{CloudError, Job, JobStatus, RdsProvider};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};

/// Provider jobs for create and restore typically finish well inside this
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(1800);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Shorter intervals, including zero, are raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Terminal failure of a wait
///
/// A timeout means the job may still be running on the provider side; a
/// failure means it will not succeed.
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("job {job_id} did not finish within {}s", .waited.as_secs())]
    TimedOut { job_id: String, waited: Duration },

    #[error("job {job_id} failed: {reason}")]
    Failed { job_id: String, reason: String },

    #[error(transparent)]
    Provider(#[from] CloudError),
}

impl From<WaitError> for CoreError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::TimedOut { job_id, waited } => CoreError::Timeout { job_id, waited },
            WaitError::Failed { job_id, reason } => CoreError::JobFailed { job_id, reason },
            WaitError::Provider(err) => err.into(),
        }
    }
}

/// A job the provider reported as completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub job: Job,
    /// Number of status queries it took
    pub polls: u32,
    pub elapsed: Duration,
}

/// Receives every status the poller observes
pub trait PollObserver: Send + Sync {
    fn on_status(&self, job_id: &str, status: &JobStatus, elapsed: Duration);
}

impl PollObserver for () {
    fn on_status(&self, _job_id: &str, _status: &JobStatus, _elapsed: Duration) {}
}

/// Polls a job until it is terminal or the deadline passes
///
/// `interval` never goes below [`MIN_POLL_INTERVAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPoller {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for JobPoller {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_JOB_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl JobPoller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub async fn wait(
        &self,
        provider: &dyn RdsProvider,
        job_id: &str,
    ) -> Result<CompletedJob, WaitError> {
        self.wait_observed(provider, job_id, &()).await
    }

    /// Query immediately, then every `interval`, never sleeping past the
    /// deadline. The deadline is checked after each query, so a job that is
    /// reported complete on the last query still counts as completed.
    #[tracing::instrument(skip(self, provider, observer), fields(timeout = self.timeout.as_secs()))]
    pub async fn wait_observed(
        &self,
        provider: &dyn RdsProvider,
        job_id: &str,
        observer: &dyn PollObserver,
    ) -> Result<CompletedJob, WaitError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let interval = self.interval.max(MIN_POLL_INTERVAL);
        let mut polls = 0;

        loop {
            let job = provider.get_job(job_id).await?;
            polls += 1;
            let elapsed = started.elapsed();
            observer.on_status(job_id, &job.status, elapsed);

            match &job.status {
                JobStatus::Completed => {
                    tracing::info!(polls, elapsed_secs = elapsed.as_secs(), "Job completed");
                    return Ok(CompletedJob {
                        job,
                        polls,
                        elapsed,
                    });
                }
                JobStatus::Failed => {
                    let reason = job
                        .fail_reason
                        .unwrap_or_else(|| "no reason given by the provider".to_string());
                    tracing::warn!(%reason, "Job failed");
                    return Err(WaitError::Failed {
                        job_id: job_id.to_string(),
                        reason,
                    });
                }
                JobStatus::Unknown(raw) => {
                    tracing::debug!("Unrecognized job status '{}', still waiting", raw);
                }
                JobStatus::Running => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::TimedOut {
                    job_id: job_id.to_string(),
                    waited: now - started,
                });
            }
            sleep(interval.min(deadline - now)).await;
        }
    }
}
