//! Cloud provider trait definition

use crate::error::Result;
use crate::model::{
    CreateInstanceRequest, ErrorLogEntry, InstanceFilter, InstancePage, InstanceRef, Job,
    LogPage, LogQuery, NetworkResource, PageRequest, PitrRequest, SlowLogEntry, Submitted,
};
use async_trait::async_trait;

/// Authenticated RDS provider session
///
/// Everything the provisioning and telemetry workflows need from the cloud
/// goes through this trait. One handle is shared by reference across all
/// components for the duration of a run.
#[async_trait]
pub trait RdsProvider: Send + Sync {
    /// Returns the provider name (e.g., "otc")
    fn name(&self) -> &str;

    /// List VPCs whose name equals `name`
    async fn list_vpcs(&self, name: &str) -> Result<Vec<NetworkResource>>;

    /// List subnets whose name equals `name`
    async fn list_subnets(&self, name: &str) -> Result<Vec<NetworkResource>>;

    /// List security groups whose name equals `name`
    async fn list_security_groups(&self, name: &str) -> Result<Vec<NetworkResource>>;

    /// List one page of instances matching `filter`
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        page: PageRequest,
    ) -> Result<InstancePage>;

    /// Submit an instance-create request
    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Submitted<InstanceRef>>;

    /// Submit a point-in-time restore request
    ///
    /// Restoring into an existing instance may not echo an instance payload.
    async fn restore_point_in_time(
        &self,
        request: &PitrRequest,
    ) -> Result<Submitted<Option<InstanceRef>>>;

    /// Query the current state of an asynchronous job
    async fn get_job(&self, job_id: &str) -> Result<Job>;

    /// Fetch one page of an instance's error log
    async fn list_error_logs(
        &self,
        instance_id: &str,
        query: &LogQuery,
    ) -> Result<LogPage<ErrorLogEntry>>;

    /// Fetch one page of an instance's slow-query log
    async fn list_slow_logs(
        &self,
        instance_id: &str,
        query: &LogQuery,
    ) -> Result<LogPage<SlowLogEntry>>;
}
