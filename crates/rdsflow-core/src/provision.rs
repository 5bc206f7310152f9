//! Submit, wait, confirm: instance creation and point-in-time restore
//!
//! Both operations walk the same state machine:
//!
//! ```text
//! BuildingRequest ──► Submitted ──► Polling ──┬──► Succeeded
//!                                             ├──► Failed
//!                                             └──► TimedOut
//! ```
//!
//! Every input is validated and every name resolved before the single
//! submission call. Nothing is retried: a rejected submission, a failed job
//! or a timeout ends the operation.

use crate::error::{CoreError, Result};
use crate::job::{DEFAULT_JOB_TIMEOUT, DEFAULT_POLL_INTERVAL, JobPoller, PollObserver};
use crate::resolver::{ResolvePolicy, ResourceResolver};
use chrono::{DateTime, FixedOffset};
use rdsflow_cloud::{
    CreateInstanceRequest, Instance, JobStatus, NetworkKind, PitrRequest, RdsProvider,
};
use rdsflow_config::{ConfigError, InstanceSpec, NetworkRef};
use std::fmt;
use std::time::Duration;

/// State of a create or restore operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPhase {
    BuildingRequest,
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl ProvisionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProvisionPhase::Succeeded | ProvisionPhase::Failed | ProvisionPhase::TimedOut
        )
    }
}

impl fmt::Display for ProvisionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisionPhase::BuildingRequest => "building request",
            ProvisionPhase::Submitted => "submitted",
            ProvisionPhase::Polling => "polling",
            ProvisionPhase::Succeeded => "succeeded",
            ProvisionPhase::Failed => "failed",
            ProvisionPhase::TimedOut => "timed out",
        };
        f.write_str(name)
    }
}

/// Progress hooks; every method defaults to doing nothing
pub trait ProvisionObserver: Send + Sync {
    fn on_phase(&self, _phase: ProvisionPhase) {}

    fn on_job_status(&self, _job_id: &str, _status: &JobStatus, _elapsed: Duration) {}
}

impl ProvisionObserver for () {}

struct ForwardPolls<'a>(&'a dyn ProvisionObserver);

impl PollObserver for ForwardPolls<'_> {
    fn on_status(&self, job_id: &str, status: &JobStatus, elapsed: Duration) {
        self.0.on_job_status(job_id, status, elapsed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Deadline for the provider job
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub resolve_policy: ResolvePolicy,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_JOB_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            resolve_policy: ResolvePolicy::default(),
        }
    }
}

/// Outcome of a successful create
#[derive(Debug, Clone)]
pub struct CreateReport {
    /// The instance as re-read after the job completed
    pub instance: Instance,
    /// First private address of the instance
    pub address: String,
    pub job_id: String,
    pub phases: Vec<ProvisionPhase>,
}

/// Outcome of a successful restore
#[derive(Debug, Clone)]
pub struct RestoreReport {
    /// Id of the instance that received the restored data
    pub instance_id: String,
    pub instance: Instance,
    pub job_id: String,
    pub phases: Vec<ProvisionPhase>,
}

/// Instance that receives the restored data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RestoreTarget {
    /// Restore the source instance onto itself
    #[default]
    InPlace,
    /// Restore into another existing instance, by name
    Instance(String),
}

/// Validated point-in-time restore input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    pub instance_name: String,
    pub restore_time: DateTime<FixedOffset>,
    pub target: RestoreTarget,
}

impl RestoreRequest {
    /// Validate raw input, in order: restore time present, restore time is
    /// RFC 3339, instance name present
    pub fn parse(
        restore_time: Option<&str>,
        instance_name: Option<&str>,
        target: RestoreTarget,
    ) -> Result<Self> {
        let raw = restore_time
            .filter(|v| !v.is_empty())
            .ok_or(CoreError::MissingInput {
                name: "RDS_RESTORE_TIME",
                example: "2020-04-04T22:08:41+00:00",
            })?;

        let restore_time =
            DateTime::parse_from_rfc3339(raw).map_err(|e| CoreError::InvalidRestoreTime {
                value: raw.to_string(),
                reason: e.to_string(),
            })?;

        let instance_name = instance_name
            .filter(|v| !v.is_empty())
            .ok_or(CoreError::MissingInput {
                name: "RDS_NAME",
                example: "mydb",
            })?
            .to_string();

        let target = match target {
            RestoreTarget::Instance(name) if name.is_empty() => RestoreTarget::InPlace,
            other => other,
        };

        Ok(Self {
            instance_name,
            restore_time,
            target,
        })
    }

    /// Restore point as epoch milliseconds
    pub fn restore_time_ms(&self) -> i64 {
        self.restore_time.timestamp_millis()
    }
}

/// Phase bookkeeping for one operation
struct PhaseLog<'a> {
    phases: Vec<ProvisionPhase>,
    observer: &'a dyn ProvisionObserver,
}

impl<'a> PhaseLog<'a> {
    fn new(observer: &'a dyn ProvisionObserver) -> Self {
        Self {
            phases: Vec::new(),
            observer,
        }
    }

    fn enter(&mut self, phase: ProvisionPhase) {
        tracing::info!(%phase, "Entering phase");
        self.phases.push(phase);
        self.observer.on_phase(phase);
    }

    fn is_finished(&self) -> bool {
        self.phases.last().is_some_and(|p| p.is_terminal())
    }

    /// Record the terminal phase for `err` unless one was already reached
    fn fail(&mut self, err: &CoreError) {
        if self.is_finished() {
            return;
        }
        let phase = match err {
            CoreError::Timeout { .. } => ProvisionPhase::TimedOut,
            _ => ProvisionPhase::Failed,
        };
        self.enter(phase);
    }
}

/// Runs create and restore operations against one provider
pub struct Provisioner<'a> {
    provider: &'a dyn RdsProvider,
    options: ProvisionOptions,
    observer: &'a dyn ProvisionObserver,
}

impl<'a> Provisioner<'a> {
    pub fn new(provider: &'a dyn RdsProvider) -> Self {
        Self {
            provider,
            options: ProvisionOptions::default(),
            observer: &(),
        }
    }

    pub fn with_options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_observer(mut self, observer: &'a dyn ProvisionObserver) -> Self {
        self.observer = observer;
        self
    }

    fn resolver(&self) -> ResourceResolver<'a> {
        ResourceResolver::new(self.provider).with_policy(self.options.resolve_policy)
    }

    fn poller(&self) -> JobPoller {
        JobPoller::new(self.options.timeout, self.options.poll_interval)
    }

    /// Re-read an instance after its job completed
    ///
    /// An instance that cannot be found at this point is a result that
    /// could not be extracted, not a resolution error.
    async fn confirm(&self, instance_id: &str) -> Result<Instance> {
        match self.resolver().get_instance_by_id(instance_id).await {
            Err(CoreError::NotFound { .. }) => Err(CoreError::Extraction(format!(
                "instance {} not found after its job completed",
                instance_id
            ))),
            other => other,
        }
    }

    /// Create the instance described by `spec` and wait until it is ready
    #[tracing::instrument(skip(self, spec), fields(instance = %spec.name))]
    pub async fn create(&self, spec: &InstanceSpec) -> Result<CreateReport> {
        let mut log = PhaseLog::new(self.observer);
        let result = self.run_create(spec, &mut log).await;
        if let Err(err) = &result {
            log.fail(err);
        }
        result
    }

    async fn run_create(&self, spec: &InstanceSpec, log: &mut PhaseLog<'_>) -> Result<CreateReport> {
        log.enter(ProvisionPhase::BuildingRequest);
        spec.validate()?;

        let resolver = self.resolver();
        let vpc_id = network_id(&resolver, spec, NetworkKind::Vpc).await?;
        let subnet_id = network_id(&resolver, spec, NetworkKind::Subnet).await?;
        let security_group_id = network_id(&resolver, spec, NetworkKind::SecurityGroup).await?;

        let request = CreateInstanceRequest {
            name: spec.name.clone(),
            datastore: spec
                .datastore
                .clone()
                .ok_or(ConfigError::MissingField("datastore"))?,
            ha: spec.ha.clone(),
            port: spec.port.clone(),
            password: spec.password.clone(),
            backup_strategy: spec.backup_strategy.clone(),
            flavor_ref: spec.flavor_ref.clone(),
            volume: spec
                .volume
                .clone()
                .ok_or(ConfigError::MissingField("volume"))?,
            region: spec.region.clone(),
            availability_zone: spec.availability_zone.clone(),
            vpc_id,
            subnet_id,
            security_group_id,
        };

        log.enter(ProvisionPhase::Submitted);
        let submitted = self
            .provider
            .create_instance(&request)
            .await
            .map_err(CoreError::submission)?;
        let job_id = submitted.job_id;
        let instance_id = submitted.resource.id;
        tracing::info!(%job_id, %instance_id, "Create submitted");

        log.enter(ProvisionPhase::Polling);
        self.poller()
            .wait_observed(self.provider, &job_id, &ForwardPolls(self.observer))
            .await?;

        // Succeeded only once the result is confirmed
        let instance = self.confirm(&instance_id).await?;
        let address = instance
            .private_address()
            .ok_or_else(|| {
                CoreError::Extraction(format!("instance {} reports no private IP", instance_id))
            })?
            .to_string();
        log.enter(ProvisionPhase::Succeeded);

        Ok(CreateReport {
            instance,
            address,
            job_id,
            phases: std::mem::take(&mut log.phases),
        })
    }

    /// Restore an instance to `request.restore_time` and wait until done
    #[tracing::instrument(skip(self, request), fields(instance = %request.instance_name, restore_time = %request.restore_time))]
    pub async fn restore(&self, request: &RestoreRequest) -> Result<RestoreReport> {
        let mut log = PhaseLog::new(self.observer);
        let result = self.run_restore(request, &mut log).await;
        if let Err(err) = &result {
            log.fail(err);
        }
        result
    }

    async fn run_restore(
        &self,
        request: &RestoreRequest,
        log: &mut PhaseLog<'_>,
    ) -> Result<RestoreReport> {
        log.enter(ProvisionPhase::BuildingRequest);

        let resolver = self.resolver();
        let source = resolver
            .resolve_instance_by_name(&request.instance_name)
            .await?;
        let target_id = match &request.target {
            RestoreTarget::InPlace => source.id.clone(),
            RestoreTarget::Instance(name) => resolver.resolve_instance_by_name(name).await?.id,
        };
        let pitr = PitrRequest::timestamp(&source.id, &target_id, request.restore_time_ms());

        log.enter(ProvisionPhase::Submitted);
        let submitted = self
            .provider
            .restore_point_in_time(&pitr)
            .await
            .map_err(CoreError::submission)?;
        let job_id = submitted.job_id;
        tracing::info!(%job_id, source = %source.id, target = %target_id, "Restore submitted");

        log.enter(ProvisionPhase::Polling);
        self.poller()
            .wait_observed(self.provider, &job_id, &ForwardPolls(self.observer))
            .await?;

        let instance = self.confirm(&target_id).await?;
        log.enter(ProvisionPhase::Succeeded);

        Ok(RestoreReport {
            instance_id: target_id,
            instance,
            job_id,
            phases: std::mem::take(&mut log.phases),
        })
    }
}

async fn network_id(
    resolver: &ResourceResolver<'_>,
    spec: &InstanceSpec,
    kind: NetworkKind,
) -> Result<String> {
    match spec.network(kind)? {
        NetworkRef::Id(id) => Ok(id),
        NetworkRef::Name(name) => resolver.resolve_network(kind, &name).await,
    }
}
