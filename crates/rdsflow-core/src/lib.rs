//! rdsflow core workflows
//!
//! - [`resolver`]: VPC, subnet, security group and instance names to ids
//! - [`job`]: waiting for asynchronous provider jobs under a deadline
//! - [`provision`]: instance creation and point-in-time restore
//! - [`logs`]: error and slow-query log retrieval over a time window
//!
//! Everything talks to the cloud through a borrowed
//! [`rdsflow_cloud::RdsProvider`] and runs strictly one call at a time.

pub mod error;
pub mod job;
pub mod logs;
pub mod provision;
pub mod resolver;

pub use error::{CoreError, Result};
pub use job::{
    CompletedJob, DEFAULT_JOB_TIMEOUT, DEFAULT_POLL_INTERVAL, JobPoller, MIN_POLL_INTERVAL,
    PollObserver, WaitError,
};
pub use logs::{
    DEFAULT_PAGE_SIZE, LogEntries, LogFetcher, LogKind, LogWindow, MAX_PAGES, Pagination,
    UnknownPagination,
};
pub use provision::{
    CreateReport, ProvisionObserver, ProvisionOptions, ProvisionPhase, Provisioner, RestoreReport,
    RestoreRequest, RestoreTarget,
};
pub use resolver::{ResolvePolicy, ResourceKind, ResourceResolver};
