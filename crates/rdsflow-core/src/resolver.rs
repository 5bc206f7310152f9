//! Name to identifier resolution for network resources and instances

use crate::error::{CoreError, Result};
use crate::logs::MAX_PAGES;
use rdsflow_cloud::{Instance, InstanceFilter, NetworkKind, PageRequest, RdsProvider};
use std::fmt;

/// Instance listings are fetched this many records at a time
pub const INSTANCE_PAGE_SIZE: u32 = 100;

/// Kind of resource a lookup targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Network(NetworkKind),
    Instance,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Network(kind) => kind.fmt(f),
            ResourceKind::Instance => write!(f, "instance"),
        }
    }
}

impl From<NetworkKind> for ResourceKind {
    fn from(kind: NetworkKind) -> Self {
        ResourceKind::Network(kind)
    }
}

/// What to do when more than one resource carries the requested name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Take the first record in provider order and log a warning
    #[default]
    FirstMatch,
    /// Fail with [`CoreError::Ambiguous`]
    RequireUnique,
}

/// Read-only lookups against the provider
pub struct ResourceResolver<'a> {
    provider: &'a dyn RdsProvider,
    policy: ResolvePolicy,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(provider: &'a dyn RdsProvider) -> Self {
        Self {
            provider,
            policy: ResolvePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Id of the VPC, subnet or security group named `name`
    #[tracing::instrument(skip(self, kind), fields(kind = %kind))]
    pub async fn resolve_network(&self, kind: NetworkKind, name: &str) -> Result<String> {
        let matches = match kind {
            NetworkKind::Vpc => self.provider.list_vpcs(name).await?,
            NetworkKind::Subnet => self.provider.list_subnets(name).await?,
            NetworkKind::SecurityGroup => self.provider.list_security_groups(name).await?,
        };

        let resource = self.select(kind.into(), name, matches)?;
        tracing::debug!("{} '{}' is {}", kind, name, resource.id);
        Ok(resource.id)
    }

    /// The instance named `name`
    #[tracing::instrument(skip(self))]
    pub async fn resolve_instance_by_name(&self, name: &str) -> Result<Instance> {
        let matches = self.list_all_instances(&InstanceFilter::by_name(name)).await?;
        self.select(ResourceKind::Instance, name, matches)
    }

    /// Current state of the instance with id `id`
    #[tracing::instrument(skip(self))]
    pub async fn get_instance_by_id(&self, id: &str) -> Result<Instance> {
        let matches = self.list_all_instances(&InstanceFilter::by_id(id)).await?;
        matches
            .into_iter()
            .find(|i| i.id == id)
            .ok_or_else(|| CoreError::NotFound {
                kind: ResourceKind::Instance,
                name: id.to_string(),
            })
    }

    /// Every instance matching `filter`, across all pages
    ///
    /// Gives up with [`CoreError::Extraction`] after [`MAX_PAGES`] requests.
    async fn list_all_instances(&self, filter: &InstanceFilter) -> Result<Vec<Instance>> {
        let mut instances = Vec::new();
        let mut offset = 0;
        let mut complete = false;

        for _ in 0..MAX_PAGES {
            let page = self
                .provider
                .list_instances(
                    filter,
                    PageRequest {
                        offset,
                        limit: INSTANCE_PAGE_SIZE,
                    },
                )
                .await?;

            if page.instances.is_empty() {
                complete = true;
                break;
            }
            offset += page.instances.len() as u32;
            instances.extend(page.instances);

            if instances.len() as u32 >= page.total_count {
                complete = true;
                break;
            }
        }

        if !complete {
            return Err(CoreError::Extraction(format!(
                "instance listing did not end after {} pages",
                MAX_PAGES
            )));
        }

        // Server-side name filters may match by prefix.
        instances.retain(|i| filter.matches(i));
        Ok(instances)
    }

    fn select<T>(&self, kind: ResourceKind, name: &str, matches: Vec<T>) -> Result<T> {
        let count = matches.len();
        if count > 1 {
            match self.policy {
                ResolvePolicy::FirstMatch => {
                    tracing::warn!(
                        "{} {}s are named '{}'; using the first one returned",
                        count,
                        kind,
                        name
                    );
                }
                ResolvePolicy::RequireUnique => {
                    return Err(CoreError::Ambiguous {
                        kind,
                        name: name.to_string(),
                        count,
                    });
                }
            }
        }

        matches.into_iter().next().ok_or_else(|| CoreError::NotFound {
            kind,
            name: name.to_string(),
        })
    }
}
