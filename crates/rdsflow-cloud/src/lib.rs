//! rdsflow cloud abstraction
//!
//! This crate defines the narrow interface through which rdsflow talks to a
//! cloud provider's managed relational database service, together with the
//! resource, job and log record types that cross it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   rdsflow CLI                    │
//! │          (create / restore / logs)               │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                 rdsflow-core                     │
//! │  resolver · job poller · provisioner · logs      │
//! └─────────────────┬───────────────────────────────┘
//!                   │  trait RdsProvider
//! ┌─────────────────▼───────────────────────────────┐
//! │                 rdsflow-cloud                    │
//! └───────┬─────────────────────────┬───────────────┘
//!         │                         │
//! ┌───────▼───────┐         ┌───────▼───────┐
//! │  OTC (REST)   │         │  MockProvider │
//! │   provider    │         │ (feature mock)│
//! └───────────────┘         └───────────────┘
//! ```

pub mod error;
pub mod model;
pub mod provider;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-exports
pub use error::{CloudError, Result};
pub use model::{
    BackupStrategy, CreateInstanceRequest, Datastore, ErrorLogEntry, Ha, Instance, InstanceFilter,
    InstancePage, InstanceRef, Job, JobStatus, LogPage, LogQuery, NetworkKind, NetworkResource,
    PageRequest, Password, PitrRequest, PitrSource, PitrTarget, SlowLogEntry, Submitted, Volume,
};
pub use provider::RdsProvider;
