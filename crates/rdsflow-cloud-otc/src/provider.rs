//! Open Telekom Cloud implementation of [`RdsProvider`]

use crate::auth::{Credentials, Session, authenticate};
use crate::client::ApiClient;
use crate::error::{OtcError, Result};
use async_trait::async_trait;
use rdsflow_cloud::{
    CreateInstanceRequest, ErrorLogEntry, Instance, InstanceFilter, InstancePage, InstanceRef, Job,
    JobStatus, LogPage, LogQuery, NetworkResource, PageRequest, PitrRequest, RdsProvider,
    SlowLogEntry, Submitted,
};
use serde::{Deserialize, Serialize};

/// VPC listings are marker-paged with this many records per request
const NETWORK_PAGE_LIMIT: u32 = 100;

/// Base URLs of the services the provider talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// RDS v3, including the project id (`.../v3/{project_id}`)
    pub rds: String,
    /// VPC v1, including the project id (`.../v1/{project_id}`)
    pub vpc: String,
    /// Networking v2 (`.../v2.0`)
    pub network: String,
}

impl Endpoints {
    /// Endpoints from the session's service catalog, falling back to the
    /// public Open Telekom Cloud naming scheme for services it does not list
    pub fn from_session(session: &Session, region: &str) -> Self {
        let project_id = &session.project_id;

        let rds = session
            .endpoint("rdsv3", region)
            .map(|url| versioned_base(&url, "v3", Some(project_id)))
            .unwrap_or_else(|| {
                format!("https://rds.{}.otc.t-systems.com/v3/{}", region, project_id)
            });
        let vpc = session
            .endpoint("vpc", region)
            .map(|url| versioned_base(&url, "v1", Some(project_id)))
            .unwrap_or_else(|| {
                format!("https://vpc.{}.otc.t-systems.com/v1/{}", region, project_id)
            });
        let network = session
            .endpoint("network", region)
            .map(|url| versioned_base(&url, "v2.0", None))
            .unwrap_or_else(|| format!("https://vpc.{}.otc.t-systems.com/v2.0", region));

        Self { rds, vpc, network }
    }
}

/// Normalize a catalog URL to `{host}/{version}[/{project_id}]`
///
/// Catalog entries come both bare (`https://rds.example`) and fully
/// qualified (`https://rds.example/v3/abc`).
pub fn versioned_base(url: &str, version: &str, project_id: Option<&str>) -> String {
    let url = url.trim_end_matches('/');
    let segment = format!("/{}", version);
    let root = url
        .match_indices(&segment)
        .map(|(pos, _)| pos)
        .find(|&pos| {
            let rest = &url[pos + segment.len()..];
            rest.is_empty() || rest.starts_with('/')
        })
        .map_or(url, |pos| &url[..pos]);

    match project_id {
        Some(project_id) => format!("{}/{}/{}", root, version, project_id),
        None => format!("{}/{}", root, version),
    }
}

/// RDS provider backed by the Open Telekom Cloud REST APIs
pub struct OtcProvider {
    client: ApiClient,
    endpoints: Endpoints,
}

impl OtcProvider {
    /// Authenticate with `credentials` and resolve service endpoints
    #[tracing::instrument(skip(credentials), fields(user = %credentials.username, region = %credentials.region))]
    pub async fn connect(credentials: &Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("rdsflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let session = authenticate(&http, credentials).await?;
        let endpoints = Endpoints::from_session(&session, &credentials.region);
        tracing::info!(rds = %endpoints.rds, "Connected to Open Telekom Cloud");

        Ok(Self {
            client: ApiClient::new(http, session.token),
            endpoints,
        })
    }

    /// Provider with a pre-issued token and explicit endpoints
    pub fn with_endpoints(token: impl Into<String>, endpoints: Endpoints) -> Self {
        Self {
            client: ApiClient::new(reqwest::Client::new(), token),
            endpoints,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn list_vpc_resources(&self, collection: &str, name: &str) -> Result<Vec<NetworkResource>> {
        let url = format!("{}/{}", self.endpoints.vpc, collection);
        let mut found = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![("limit", NETWORK_PAGE_LIMIT.to_string())];
            if let Some(marker) = &marker {
                query.push(("marker", marker.clone()));
            }

            let page: VpcListing = self.client.get(&url, &query).await?;
            let items = match collection {
                "vpcs" => page.vpcs,
                _ => page.subnets,
            };
            let count = items.len();
            let next = items.last().map(|r| r.id.clone());
            found.extend(items.into_iter().filter(|r| r.name == name));

            if count < NETWORK_PAGE_LIMIT as usize || next.is_none() {
                break;
            }
            if next == marker {
                tracing::warn!("{} listing repeated marker {:?}, stopping", collection, next);
                break;
            }
            marker = next;
        }

        tracing::debug!("{} named {:?}: {}", collection, name, found.len());
        Ok(found)
    }

    fn log_query(query: &LogQuery) -> Vec<(&'static str, String)> {
        vec![
            ("start_date", query.start_date.clone()),
            ("end_date", query.end_date.clone()),
            ("offset", query.page.to_string()),
            ("limit", query.limit.to_string()),
        ]
    }
}

#[async_trait]
impl RdsProvider for OtcProvider {
    fn name(&self) -> &str {
        "otc"
    }

    async fn list_vpcs(&self, name: &str) -> rdsflow_cloud::Result<Vec<NetworkResource>> {
        Ok(self.list_vpc_resources("vpcs", name).await?)
    }

    async fn list_subnets(&self, name: &str) -> rdsflow_cloud::Result<Vec<NetworkResource>> {
        Ok(self.list_vpc_resources("subnets", name).await?)
    }

    async fn list_security_groups(
        &self,
        name: &str,
    ) -> rdsflow_cloud::Result<Vec<NetworkResource>> {
        let url = format!("{}/security-groups", self.endpoints.network);
        let listing: SecurityGroupListing = self
            .client
            .get(&url, &[("name", name.to_string())])
            .await
            .map_err(OtcError::into_cloud)?;

        Ok(listing
            .security_groups
            .into_iter()
            .filter(|g| g.name == name)
            .collect())
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        page: PageRequest,
    ) -> rdsflow_cloud::Result<InstancePage> {
        let url = format!("{}/instances", self.endpoints.rds);
        let mut query = vec![
            ("offset", page.offset.to_string()),
            ("limit", page.limit.to_string()),
        ];
        if let Some(id) = &filter.id {
            query.push(("id", id.clone()));
        }
        if let Some(name) = &filter.name {
            query.push(("name", name.clone()));
        }

        let listing: InstanceListing = self
            .client
            .get(&url, &query)
            .await
            .map_err(OtcError::into_cloud)?;

        Ok(InstancePage {
            instances: listing.instances,
            total_count: listing.total_count,
        })
    }

    async fn create_instance(
        &self,
        request: &CreateInstanceRequest,
    ) -> rdsflow_cloud::Result<Submitted<InstanceRef>> {
        let url = format!("{}/instances", self.endpoints.rds);
        tracing::info!(name = %request.name, flavor = %request.flavor_ref, "Submitting instance create");

        let response: SubmissionResponse = self
            .client
            .post(&url, request)
            .await
            .map_err(OtcError::into_cloud)?;

        let instance = response.instance.ok_or_else(|| {
            rdsflow_cloud::CloudError::Decode(format!("{} returned no instance payload", url))
        })?;

        Ok(Submitted {
            resource: instance,
            job_id: response.job_id,
        })
    }

    async fn restore_point_in_time(
        &self,
        request: &PitrRequest,
    ) -> rdsflow_cloud::Result<Submitted<Option<InstanceRef>>> {
        let url = format!("{}/instances/recovery", self.endpoints.rds);
        tracing::info!(
            source = %request.source.instance_id,
            target = %request.target.instance_id,
            restore_time = request.source.restore_time,
            "Submitting point-in-time restore"
        );

        let response: SubmissionResponse = self
            .client
            .post(&url, request)
            .await
            .map_err(OtcError::into_cloud)?;

        Ok(Submitted {
            resource: response.instance,
            job_id: response.job_id,
        })
    }

    async fn get_job(&self, job_id: &str) -> rdsflow_cloud::Result<Job> {
        let url = format!("{}/jobs", self.endpoints.rds);
        let response: JobResponse = self
            .client
            .get(&url, &[("id", job_id.to_string())])
            .await
            .map_err(OtcError::into_cloud)?;

        let mut job = Job::new(response.job.id, JobStatus::parse(&response.job.status));
        job.fail_reason = response.job.fail_reason.filter(|r| !r.is_empty());
        Ok(job)
    }

    async fn list_error_logs(
        &self,
        instance_id: &str,
        query: &LogQuery,
    ) -> rdsflow_cloud::Result<LogPage<ErrorLogEntry>> {
        let url = format!("{}/instances/{}/errorlog", self.endpoints.rds, instance_id);
        let response: ErrorLogResponse = self
            .client
            .get(&url, &Self::log_query(query))
            .await
            .map_err(OtcError::into_cloud)?;

        Ok(LogPage::new(response.error_log_list, response.total_record))
    }

    async fn list_slow_logs(
        &self,
        instance_id: &str,
        query: &LogQuery,
    ) -> rdsflow_cloud::Result<LogPage<SlowLogEntry>> {
        let url = format!("{}/instances/{}/slowlog", self.endpoints.rds, instance_id);
        let response: SlowLogResponse = self
            .client
            .get(&url, &Self::log_query(query))
            .await
            .map_err(OtcError::into_cloud)?;

        Ok(LogPage::new(response.slow_log_list, response.total_record))
    }
}

impl OtcError {
    fn into_cloud(self) -> rdsflow_cloud::CloudError {
        self.into()
    }
}

// ============ API Types ============

#[derive(Debug, Default, Deserialize)]
struct VpcListing {
    #[serde(default)]
    vpcs: Vec<NetworkResource>,
    #[serde(default)]
    subnets: Vec<NetworkResource>,
}

#[derive(Debug, Deserialize)]
struct SecurityGroupListing {
    #[serde(default)]
    security_groups: Vec<NetworkResource>,
}

#[derive(Debug, Deserialize)]
struct InstanceListing {
    #[serde(default)]
    instances: Vec<Instance>,
    #[serde(default)]
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    #[serde(default)]
    instance: Option<InstanceRef>,
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    job: ApiJob,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiJob {
    id: String,
    status: String,
    #[serde(default)]
    fail_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorLogResponse {
    #[serde(default)]
    error_log_list: Vec<ErrorLogEntry>,
    #[serde(default)]
    total_record: u32,
}

#[derive(Debug, Deserialize)]
struct SlowLogResponse {
    #[serde(default)]
    slow_log_list: Vec<SlowLogEntry>,
    #[serde(default)]
    total_record: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdsflow_cloud::CloudError;
    use serde_json::json;
    use rdsflow_cloud::{BackupStrategy, Datastore, Ha, Password, Volume};
    use wiremock::matchers::{
        body_json, body_partial_json, header, method, path, query_param, query_param_is_missing,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OtcProvider {
        OtcProvider::with_endpoints(
            "tok-123",
            Endpoints {
                rds: format!("{}/v3/p-1", server.uri()),
                vpc: format!("{}/v1/p-1", server.uri()),
                network: format!("{}/v2.0", server.uri()),
            },
        )
    }

    #[test]
    fn test_versioned_base() {
        assert_eq!(
            versioned_base("https://rds.example/v3/p-1/", "v3", Some("p-1")),
            "https://rds.example/v3/p-1"
        );
        assert_eq!(
            versioned_base("https://rds.example", "v3", Some("p-1")),
            "https://rds.example/v3/p-1"
        );
        assert_eq!(
            versioned_base("https://vpc.example/v2.0", "v2.0", None),
            "https://vpc.example/v2.0"
        );
        assert_eq!(
            versioned_base("https://vpc.example/v1", "v1", Some("p-1")),
            "https://vpc.example/v1/p-1"
        );
    }

    #[tokio::test]
    async fn test_list_subnets_filters_by_exact_name() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/p-1/subnets"))
            .and(header("X-Auth-Token", "tok-123"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subnets": [
                    {"id": "s-1", "name": "app", "status": "ACTIVE"},
                    {"id": "s-2", "name": "application", "status": "ACTIVE"}
                ]
            })))
            .mount(&mock_server)
            .await;

        let subnets = provider(&mock_server).list_subnets("app").await.unwrap();
        assert_eq!(subnets.len(), 1);
        assert_eq!(subnets[0].id, "s-1");
    }

    #[tokio::test]
    async fn test_list_vpcs_follows_marker() {
        let mock_server = MockServer::start().await;

        let first_page: Vec<_> = (0..100)
            .map(|i| json!({"id": format!("v-{:03}", i), "name": format!("vpc-{}", i)}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/v1/p-1/vpcs"))
            .and(query_param("limit", "100"))
            .and(query_param_is_missing("marker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vpcs": first_page})))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/p-1/vpcs"))
            .and(query_param("marker", "v-099"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vpcs": [
                    {"id": "v-100", "name": "main-vpc"},
                    {"id": "v-101", "name": "vpc-7"}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let vpcs = provider(&mock_server).list_vpcs("vpc-7").await.unwrap();
        assert_eq!(
            vpcs,
            vec![
                NetworkResource::new("v-007", "vpc-7"),
                NetworkResource::new("v-101", "vpc-7"),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_vpcs_stops_on_repeated_marker() {
        let mock_server = MockServer::start().await;

        let full_page: Vec<_> = (0..100)
            .map(|i| json!({"id": format!("v-{:03}", i), "name": "main-vpc"}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/v1/p-1/vpcs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vpcs": full_page})))
            .expect(2)
            .mount(&mock_server)
            .await;

        let vpcs = provider(&mock_server).list_vpcs("main-vpc").await.unwrap();
        assert_eq!(vpcs.len(), 200);
    }

    #[tokio::test]
    async fn test_create_instance_posts_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/p-1/instances"))
            .and(header("X-Auth-Token", "tok-123"))
            .and(body_partial_json(json!({
                "name": "mydb",
                "vpc_id": "vpc-1",
                "subnet_id": "subnet-1",
                "security_group_id": "sg-1",
                "ha": {"mode": "Ha", "replication_mode": "semisync"},
                "backup_strategy": {"start_time": "08:00-09:00", "keep_days": 7},
                "volume": {"type": "COMMON", "size": 100}
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "instance": {"id": "inst-1", "name": "mydb", "status": "BUILD"},
                "job_id": "job-1"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let request = CreateInstanceRequest {
            name: "mydb".to_string(),
            datastore: Datastore {
                engine: "MySQL".to_string(),
                version: "8.0".to_string(),
            },
            ha: Some(Ha {
                mode: "Ha".to_string(),
                replication_mode: Some("semisync".to_string()),
            }),
            port: Some("3306".to_string()),
            password: Password::new("Secr3t!pass"),
            backup_strategy: Some(BackupStrategy {
                start_time: "08:00-09:00".to_string(),
                keep_days: Some(7),
            }),
            flavor_ref: "rds.mysql.c2.large.ha".to_string(),
            volume: Volume {
                volume_type: "COMMON".to_string(),
                size: 100,
            },
            region: "eu-de".to_string(),
            availability_zone: "eu-de-01,eu-de-02".to_string(),
            vpc_id: "vpc-1".to_string(),
            subnet_id: "subnet-1".to_string(),
            security_group_id: "sg-1".to_string(),
        };

        let submitted = provider(&mock_server)
            .create_instance(&request)
            .await
            .unwrap();
        assert_eq!(submitted.job_id, "job-1");
        assert_eq!(submitted.resource.id, "inst-1");
        assert_eq!(submitted.resource.status.as_deref(), Some("BUILD"));
    }

    #[tokio::test]
    async fn test_create_instance_without_payload_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/p-1/instances"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"job_id": "job-1"})))
            .mount(&mock_server)
            .await;

        let request = CreateInstanceRequest {
            name: "mydb".to_string(),
            datastore: Datastore {
                engine: "MySQL".to_string(),
                version: "8.0".to_string(),
            },
            ha: None,
            port: None,
            password: Password::new("pw"),
            backup_strategy: None,
            flavor_ref: "rds.mysql.c2.large".to_string(),
            volume: Volume {
                volume_type: "COMMON".to_string(),
                size: 40,
            },
            region: "eu-de".to_string(),
            availability_zone: "eu-de-01".to_string(),
            vpc_id: "vpc-1".to_string(),
            subnet_id: "subnet-1".to_string(),
            security_group_id: "sg-1".to_string(),
        };

        let err = provider(&mock_server)
            .create_instance(&request)
            .await
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[tokio::test]
    async fn test_list_security_groups() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2.0/security-groups"))
            .and(query_param("name", "db-sg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "security_groups": [{"id": "sg-1", "name": "db-sg", "description": ""}]
            })))
            .mount(&mock_server)
            .await;

        let groups = provider(&mock_server)
            .list_security_groups("db-sg")
            .await
            .unwrap();
        assert_eq!(groups, vec![NetworkResource::new("sg-1", "db-sg")]);
    }

    #[tokio::test]
    async fn test_list_instances_by_name() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/p-1/instances"))
            .and(query_param("name", "mydb"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "instances": [{
                    "id": "abc",
                    "name": "mydb",
                    "status": "ACTIVE",
                    "private_ips": ["192.168.0.12"],
                    "public_ips": null,
                    "port": 3306
                }],
                "total_count": 1
            })))
            .mount(&mock_server)
            .await;

        let page = provider(&mock_server)
            .list_instances(
                &InstanceFilter::by_name("mydb"),
                PageRequest {
                    offset: 0,
                    limit: 100,
                },
            )
            .await
            .unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.instances[0].private_address(), Some("192.168.0.12"));
    }

    #[tokio::test]
    async fn test_restore_posts_pitr_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/p-1/instances/recovery"))
            .and(body_json(json!({
                "source": {"instance_id": "abc", "type": "timestamp", "restore_time": 1586038121000i64},
                "target": {"instance_id": "abc"}
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"job_id": "job-9"})))
            .mount(&mock_server)
            .await;

        let submitted = provider(&mock_server)
            .restore_point_in_time(&PitrRequest::timestamp("abc", "abc", 1_586_038_121_000))
            .await
            .unwrap();

        assert_eq!(submitted.job_id, "job-9");
        assert!(submitted.resource.is_none());
    }

    #[tokio::test]
    async fn test_get_job_failed_with_reason() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/p-1/jobs"))
            .and(query_param("id", "job-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job": {"id": "job-9", "name": "CreateMysqlSingleHAInstance", "status": "Failed", "fail_reason": "quota exceeded"}
            })))
            .mount(&mock_server)
            .await;

        let job = provider(&mock_server).get_job("job-9").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.fail_reason.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn test_error_log_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/p-1/instances/abc/errorlog"))
            .and(query_param("start_date", "2024-02-29T12:00:00+0000"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error_log_list": [{"time": "2024-03-01T10:00:00", "level": "ERROR", "content": "boom"}],
                "total_record": 101
            })))
            .mount(&mock_server)
            .await;

        let page = provider(&mock_server)
            .list_error_logs(
                "abc",
                &LogQuery {
                    start_date: "2024-02-29T12:00:00+0000".to_string(),
                    end_date: "2024-03-31T12:00:00+0000".to_string(),
                    page: 2,
                    limit: 100,
                },
            )
            .await
            .unwrap();

        assert_eq!(page.total_record, 101);
        assert_eq!(page.entries[0].content.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/p-1/instances/recovery"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error_code": "DBS.280238",
                "error_msg": "The restoration time is out of range."
            })))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server)
            .restore_point_in_time(&PitrRequest::timestamp("abc", "abc", 0))
            .await
            .unwrap_err();

        match err {
            CloudError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("out of range"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v3/p-1/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&mock_server)
            .await;

        let err = provider(&mock_server).get_job("job-1").await.unwrap_err();
        assert!(err.is_decode());
    }
}
