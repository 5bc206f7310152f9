//! Open Telekom Cloud provider for rdsflow
//!
//! Implements [`rdsflow_cloud::RdsProvider`] on top of the OTC REST APIs:
//!
//! - Identity (Keystone v3) for password login and the service catalog
//! - RDS v3 for instances, jobs, point-in-time restore and logs
//! - VPC v1 for VPCs and subnets
//! - Networking v2 for security groups
//!
//! # Example
//!
//! ```ignore
//! use rdsflow_cloud::RdsProvider;
//! use rdsflow_cloud_otc::{Credentials, OtcProvider};
//!
//! let provider = OtcProvider::connect(&Credentials {
//!     auth_url: "https://iam.eu-de.otc.t-systems.com:443/v3".to_string(),
//!     user_domain_name: "OTC00000000001000000001".to_string(),
//!     username: "alice".to_string(),
//!     password: std::env::var("OS_PASSWORD")?,
//!     project_name: "eu-de".to_string(),
//!     region: "eu-de".to_string(),
//! })
//! .await?;
//!
//! let job = provider.get_job("ff8080817...").await?;
//! ```
//!
//! Request and response bodies are logged at `debug` level under the
//! `rdsflow_cloud_otc` target. Tokens and passwords are never logged.

pub mod auth;
pub mod client;
pub mod error;
pub mod provider;

pub use auth::{Credentials, Session, authenticate};
pub use error::{OtcError, Result};
pub use provider::{Endpoints, OtcProvider};
