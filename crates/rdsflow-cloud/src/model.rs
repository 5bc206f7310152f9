//! Resource and request types exchanged with the provider
//!
//! Field names follow the RDS v3 wire format so the same types serialize
//! straight into request bodies. Records read back from the provider keep
//! any field this crate does not model in an `extra` map, so nothing the
//! provider sent is lost when a record is printed again.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of network resource an instance is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Vpc,
    Subnet,
    SecurityGroup,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkKind::Vpc => write!(f, "VPC"),
            NetworkKind::Subnet => write!(f, "subnet"),
            NetworkKind::SecurityGroup => write!(f, "security group"),
        }
    }
}

/// A VPC, subnet or security group as listed by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkResource {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl NetworkResource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: None,
        }
    }
}

/// Database engine and version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastore {
    #[serde(rename = "type")]
    pub engine: String,
    pub version: String,
}

/// High-availability settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ha {
    pub mode: String,

    #[serde(
        default,
        alias = "replicationmode",
        skip_serializing_if = "Option::is_none"
    )]
    pub replication_mode: Option<String>,
}

/// Automated backup policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupStrategy {
    /// Daily backup window, e.g. `08:00-09:00`
    #[serde(alias = "starttime")]
    pub start_time: String,

    #[serde(default, alias = "keepdays", skip_serializing_if = "Option::is_none")]
    pub keep_days: Option<u32>,
}

/// Storage volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(rename = "type")]
    pub volume_type: String,
    pub size: u32,
}

/// Administrator password; never printed by `Debug`
#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl Serialize for Password {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Body of an instance-create submission with every network id resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateInstanceRequest {
    pub name: String,
    pub datastore: Datastore,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ha: Option<Ha>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    pub password: Password,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_strategy: Option<BackupStrategy>,

    pub flavor_ref: String,
    pub volume: Volume,
    pub region: String,
    pub availability_zone: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub security_group_id: String,
}

/// Point-in-time restore request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitrRequest {
    pub source: PitrSource,
    pub target: PitrTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitrSource {
    pub instance_id: String,

    /// Always `timestamp` for point-in-time restores
    #[serde(rename = "type")]
    pub restore_type: String,

    /// Epoch milliseconds
    pub restore_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitrTarget {
    pub instance_id: String,
}

impl PitrRequest {
    pub fn timestamp(
        source_instance_id: impl Into<String>,
        target_instance_id: impl Into<String>,
        restore_time_ms: i64,
    ) -> Self {
        Self {
            source: PitrSource {
                instance_id: source_instance_id.into(),
                restore_type: "timestamp".to_string(),
                restore_time: restore_time_ms,
            },
            target: PitrTarget {
                instance_id: target_instance_id.into(),
            },
        }
    }
}

/// Immediate payload returned alongside a submitted job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRef {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Result of a create/restore submission: the resource payload plus the
/// asynchronous job that completes it
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted<T> {
    pub resource: T,
    pub job_id: String,
}

/// A database instance with its runtime attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub private_ips: Vec<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub public_ips: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Instance {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: None,
            private_ips: Vec::new(),
            public_ips: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_private_ip(mut self, ip: impl Into<String>) -> Self {
        self.private_ips.push(ip.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// First non-empty private address
    pub fn private_address(&self) -> Option<&str> {
        self.private_ips
            .iter()
            .map(String::as_str)
            .find(|ip| !ip.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Instance list filter; unset fields do not constrain the listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl InstanceFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    pub fn matches(&self, instance: &Instance) -> bool {
        self.id.as_ref().is_none_or(|id| *id == instance.id)
            && self.name.as_ref().is_none_or(|name| *name == instance.name)
    }
}

/// Offset/limit window over a record listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Index of the first record, starting at 0
    pub offset: u32,
    pub limit: u32,
}

/// One page of an instance listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstancePage {
    pub instances: Vec<Instance>,
    pub total_count: u32,
}

/// Status of an asynchronous provider job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Unknown(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Running" | "Pending" | "Created" => JobStatus::Running,
            "Completed" => JobStatus::Completed,
            "Failed" => JobStatus::Failed,
            other => JobStatus::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Unknown(raw) => write!(f, "unknown ({})", raw),
        }
    }
}

/// Snapshot of an asynchronous job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub fail_reason: Option<String>,
}

impl Job {
    pub fn new(id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            fail_reason: None,
        }
    }
}

/// Time-bounded, paged log query
///
/// Dates are already in the provider's timestamp grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub start_date: String,
    pub end_date: String,
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
}

/// Error-log record
///
/// Known fields are always written, `null` when the provider sent none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    #[serde(default)]
    pub time: Option<String>,

    #[serde(default)]
    pub level: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Slow-query-log record; known fields are always written like
/// [`ErrorLogEntry`]'s
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowLogEntry {
    /// Number of executions
    #[serde(default)]
    pub count: Option<String>,

    /// Execution duration
    #[serde(default)]
    pub time: Option<String>,

    #[serde(default)]
    pub lock_time: Option<String>,

    #[serde(default)]
    pub rows_sent: Option<String>,

    #[serde(default)]
    pub rows_examined: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub users: Option<String>,

    #[serde(default)]
    pub query_sample: Option<String>,

    #[serde(rename = "type", default)]
    pub log_type: Option<String>,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of log records plus the provider's total for the whole query
#[derive(Debug, Clone, PartialEq)]
pub struct LogPage<T> {
    pub entries: Vec<T>,
    pub total_record: u32,
}

impl<T> LogPage<T> {
    pub fn new(entries: Vec<T>, total_record: u32) -> Self {
        Self {
            entries,
            total_record,
        }
    }
}
