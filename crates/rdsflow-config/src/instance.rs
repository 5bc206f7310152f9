//! Declarative instance document (`rds.yaml`)

use crate::error::{ConfigError, Result};
use rdsflow_cloud::{BackupStrategy, Datastore, Ha, NetworkKind, Password, Volume};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// How a network dependency is identified in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkRef {
    /// Provider id, used as-is
    Id(String),
    /// Human-readable name, resolved against the provider
    Name(String),
}

/// Desired database instance, as written in the instance document
///
/// ```yaml
/// name: mydb
/// datastore:
///   type: MySQL
///   version: "8.0"
/// ha:
///   mode: Ha
///   replicationmode: semisync
/// port: 3306
/// password: "..."
/// backupstrategy:
///   starttime: "08:00-09:00"
///   keepdays: 7
/// flavorref: rds.mysql.c2.large.ha
/// volume:
///   type: COMMON
///   size: 100
/// region: eu-de
/// availabilityzone: eu-de-01,eu-de-02
/// vpc: my-vpc
/// subnet: my-subnet
/// securitygroup: my-sg
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstanceSpec {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub datastore: Option<Datastore>,

    #[serde(default)]
    pub ha: Option<Ha>,

    #[serde(default, deserialize_with = "port_as_string")]
    pub port: Option<String>,

    #[serde(default)]
    pub password: Password,

    #[serde(default, rename = "backupstrategy", alias = "backup_strategy")]
    pub backup_strategy: Option<BackupStrategy>,

    #[serde(default, rename = "flavorref", alias = "flavor_ref")]
    pub flavor_ref: String,

    #[serde(default)]
    pub volume: Option<Volume>,

    #[serde(default)]
    pub region: String,

    #[serde(default, rename = "availabilityzone", alias = "availability_zone")]
    pub availability_zone: String,

    #[serde(default)]
    pub vpc: Option<String>,

    #[serde(default)]
    pub subnet: Option<String>,

    #[serde(default, rename = "securitygroup", alias = "security_group")]
    pub security_group: Option<String>,

    #[serde(default, rename = "vpcid", alias = "vpc_id")]
    pub vpc_id: Option<String>,

    #[serde(default, rename = "subnetid", alias = "subnet_id")]
    pub subnet_id: Option<String>,

    #[serde(default, rename = "securitygroupid", alias = "security_group_id")]
    pub security_group_id: Option<String>,
}

impl InstanceSpec {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let spec: Self = serde_yaml::from_str(content)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Read, parse and validate the document at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded instance document {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Check every field a create submission needs
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", self.name.is_empty()),
            ("datastore", self.datastore.is_none()),
            ("password", self.password.is_empty()),
            ("flavorref", self.flavor_ref.is_empty()),
            ("volume", self.volume.is_none()),
            ("region", self.region.is_empty()),
            ("availabilityzone", self.availability_zone.is_empty()),
        ];
        if let Some((field, _)) = required.into_iter().find(|(_, missing)| *missing) {
            return Err(ConfigError::MissingField(field));
        }

        for kind in [NetworkKind::Vpc, NetworkKind::Subnet, NetworkKind::SecurityGroup] {
            self.network(kind)?;
        }
        Ok(())
    }

    /// Reference for one network dependency; an id wins over a name
    pub fn network(&self, kind: NetworkKind) -> Result<NetworkRef> {
        let (id, name) = match kind {
            NetworkKind::Vpc => (&self.vpc_id, &self.vpc),
            NetworkKind::Subnet => (&self.subnet_id, &self.subnet),
            NetworkKind::SecurityGroup => (&self.security_group_id, &self.security_group),
        };

        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        non_empty(id)
            .map(NetworkRef::Id)
            .or_else(|| non_empty(name).map(NetworkRef::Name))
            .ok_or(ConfigError::MissingNetwork { kind })
    }
}

fn port_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    Ok(Option::<Port>::deserialize(deserializer)?.map(|port| match port {
        Port::Number(n) => n.to_string(),
        Port::Text(s) => s,
    }))
}
