//! In-memory provider for tests
//!
//! Holds a fixed inventory of networks, instances and log records, replays
//! scripted job status sequences, and records every call it receives so
//! tests can assert on ordering and on "no provider call was made".

use crate::error::{CloudError, Result};
use crate::model::{
    CreateInstanceRequest, ErrorLogEntry, Instance, InstanceFilter, InstancePage, InstanceRef,
    Job, JobStatus, LogPage, LogQuery, NetworkResource, PageRequest, PitrRequest, SlowLogEntry,
    Submitted,
};
use crate::provider::RdsProvider;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// A call observed by [`MockProvider`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    ListVpcs(String),
    ListSubnets(String),
    ListSecurityGroups(String),
    ListInstances(InstanceFilter, PageRequest),
    CreateInstance(CreateInstanceRequest),
    RestorePointInTime(PitrRequest),
    GetJob(String),
    ListErrorLogs { instance_id: String, query: LogQuery },
    ListSlowLogs { instance_id: String, query: LogQuery },
}

impl MockCall {
    /// True for create/restore submissions
    pub fn is_submission(&self) -> bool {
        matches!(
            self,
            MockCall::CreateInstance(_) | MockCall::RestorePointInTime(_)
        )
    }
}

#[derive(Default)]
struct MockState {
    vpcs: Vec<NetworkResource>,
    subnets: Vec<NetworkResource>,
    security_groups: Vec<NetworkResource>,
    instances: Vec<Instance>,
    job_script: Vec<JobStatus>,
    jobs: HashMap<String, VecDeque<JobStatus>>,
    fail_reason: Option<String>,
    reject_submissions: Option<String>,
    assigned_address: Option<String>,
    error_logs: Vec<ErrorLogEntry>,
    slow_logs: Vec<SlowLogEntry>,
    ignore_paging: bool,
    stuck_instance_total: Option<u32>,
    next_id: u32,
    calls: Vec<MockCall>,
}

/// In-memory [`RdsProvider`]
pub struct MockProvider {
    state: Mutex<MockState>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Empty inventory; submitted jobs complete on their first poll
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                job_script: vec![JobStatus::Completed],
                assigned_address: Some("192.168.0.10".to_string()),
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked mid-call.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_vpc(self, id: &str, name: &str) -> Self {
        self.state().vpcs.push(NetworkResource::new(id, name));
        self
    }

    pub fn with_subnet(self, id: &str, name: &str) -> Self {
        self.state().subnets.push(NetworkResource::new(id, name));
        self
    }

    pub fn with_security_group(self, id: &str, name: &str) -> Self {
        self.state()
            .security_groups
            .push(NetworkResource::new(id, name));
        self
    }

    pub fn with_instance(self, instance: Instance) -> Self {
        self.state().instances.push(instance);
        self
    }

    /// Status sequence every submitted job reports; the last status repeats
    pub fn with_job_script(self, script: Vec<JobStatus>) -> Self {
        self.state().job_script = script;
        self
    }

    /// Reason reported alongside a `Failed` job status
    pub fn with_fail_reason(self, reason: &str) -> Self {
        self.state().fail_reason = Some(reason.to_string());
        self
    }

    /// Reject every create/restore submission with an HTTP 400
    pub fn rejecting_submissions(self, message: &str) -> Self {
        self.state().reject_submissions = Some(message.to_string());
        self
    }

    /// Private address given to instances created through this provider
    pub fn with_assigned_address(self, address: Option<&str>) -> Self {
        self.state().assigned_address = address.map(str::to_string);
        self
    }

    pub fn with_error_logs(self, entries: Vec<ErrorLogEntry>) -> Self {
        self.state().error_logs = entries;
        self
    }

    pub fn with_slow_logs(self, entries: Vec<SlowLogEntry>) -> Self {
        self.state().slow_logs = entries;
        self
    }

    /// Answer every log query with all records at once, whatever page was asked
    pub fn ignoring_log_paging(self) -> Self {
        self.state().ignore_paging = true;
        self
    }

    /// Serve the first page of instances for every offset while claiming
    /// `total` records exist
    pub fn with_stuck_instance_paging(self, total: u32) -> Self {
        self.state().stuck_instance_total = Some(total);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn submission_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_submission())
            .count()
    }

    pub fn job_poll_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::GetJob(_)))
            .count()
    }

    fn record(&self, call: MockCall) {
        self.state().calls.push(call);
    }

    fn start_job(state: &mut MockState) -> String {
        state.next_id += 1;
        let job_id = format!("job-{}", state.next_id);
        state
            .jobs
            .insert(job_id.clone(), state.job_script.iter().cloned().collect());
        job_id
    }
}

fn named(resources: &[NetworkResource], name: &str) -> Vec<NetworkResource> {
    resources.iter().filter(|r| r.name == name).cloned().collect()
}

fn page_of<T: Clone>(records: &[T], query: &LogQuery, ignore_paging: bool) -> LogPage<T> {
    let total = records.len() as u32;
    if ignore_paging {
        return LogPage::new(records.to_vec(), total);
    }
    let start = (query.page.saturating_sub(1) as usize).saturating_mul(query.limit as usize);
    let entries = records
        .iter()
        .skip(start)
        .take(query.limit as usize)
        .cloned()
        .collect();
    LogPage::new(entries, total)
}

#[async_trait]
impl RdsProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_vpcs(&self, name: &str) -> Result<Vec<NetworkResource>> {
        self.record(MockCall::ListVpcs(name.to_string()));
        Ok(named(&self.state().vpcs, name))
    }

    async fn list_subnets(&self, name: &str) -> Result<Vec<NetworkResource>> {
        self.record(MockCall::ListSubnets(name.to_string()));
        Ok(named(&self.state().subnets, name))
    }

    async fn list_security_groups(&self, name: &str) -> Result<Vec<NetworkResource>> {
        self.record(MockCall::ListSecurityGroups(name.to_string()));
        Ok(named(&self.state().security_groups, name))
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        page: PageRequest,
    ) -> Result<InstancePage> {
        self.record(MockCall::ListInstances(filter.clone(), page));
        let state = self.state();
        let matching: Vec<&Instance> = state
            .instances
            .iter()
            .filter(|i| filter.matches(i))
            .collect();
        if let Some(total) = state.stuck_instance_total {
            return Ok(InstancePage {
                total_count: total,
                instances: matching
                    .into_iter()
                    .take(page.limit as usize)
                    .cloned()
                    .collect(),
            });
        }
        Ok(InstancePage {
            total_count: matching.len() as u32,
            instances: matching
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .cloned()
                .collect(),
        })
    }

    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> Result<Submitted<InstanceRef>> {
        self.record(MockCall::CreateInstance(request.clone()));
        let mut state = self.state();
        if let Some(message) = &state.reject_submissions {
            return Err(CloudError::Api {
                status: 400,
                message: message.clone(),
            });
        }

        let job_id = Self::start_job(&mut state);
        let id = format!("inst-{}", state.next_id);
        let mut instance = Instance::new(&id, &request.name).with_status("BUILD");
        if let Some(address) = &state.assigned_address {
            instance = instance.with_private_ip(address);
        }
        state.instances.push(instance);

        Ok(Submitted {
            resource: InstanceRef {
                id,
                name: request.name.clone(),
                status: Some("BUILD".to_string()),
            },
            job_id,
        })
    }

    async fn restore_point_in_time(
        &self,
        request: &PitrRequest,
    ) -> Result<Submitted<Option<InstanceRef>>> {
        self.record(MockCall::RestorePointInTime(request.clone()));
        let mut state = self.state();
        if let Some(message) = &state.reject_submissions {
            return Err(CloudError::Api {
                status: 400,
                message: message.clone(),
            });
        }

        let job_id = Self::start_job(&mut state);
        let target = state
            .instances
            .iter()
            .find(|i| i.id == request.target.instance_id)
            .map(|i| InstanceRef {
                id: i.id.clone(),
                name: i.name.clone(),
                status: Some("RESTORING".to_string()),
            });

        Ok(Submitted {
            resource: target,
            job_id,
        })
    }

    async fn get_job(&self, job_id: &str) -> Result<Job> {
        self.record(MockCall::GetJob(job_id.to_string()));
        let mut state = self.state();
        let fail_reason = state.fail_reason.clone();
        let script = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| CloudError::ResourceNotFound(format!("job {}", job_id)))?;

        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
        .unwrap_or(JobStatus::Running);

        let mut job = Job::new(job_id, status);
        if job.status == JobStatus::Failed {
            job.fail_reason = fail_reason;
        }
        Ok(job)
    }

    async fn list_error_logs(
        &self,
        instance_id: &str,
        query: &LogQuery,
    ) -> Result<LogPage<ErrorLogEntry>> {
        self.record(MockCall::ListErrorLogs {
            instance_id: instance_id.to_string(),
            query: query.clone(),
        });
        let state = self.state();
        Ok(page_of(&state.error_logs, query, state.ignore_paging))
    }

    async fn list_slow_logs(
        &self,
        instance_id: &str,
        query: &LogQuery,
    ) -> Result<LogPage<SlowLogEntry>> {
        self.record(MockCall::ListSlowLogs {
            instance_id: instance_id.to_string(),
            query: query.clone(),
        });
        let state = self.state();
        Ok(page_of(&state.slow_logs, query, state.ignore_paging))
    }
}
