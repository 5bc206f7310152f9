use rdsflow_cloud::mock::MockProvider;
use rdsflow_cloud::{ErrorLogEntry, Instance, SlowLogEntry};
use rdsflow_config::InstanceSpec;

#[allow(dead_code)]
pub const INSTANCE_DOC: &str = r#"
name: mydb
datastore:
  type: MySQL
  version: "8.0"
ha:
  mode: Ha
  replicationmode: semisync
port: 3306
password: "Secr3t!pass"
backupstrategy:
  starttime: "08:00-09:00"
  keepdays: 7
flavorref: rds.mysql.c2.large.ha
volume:
  type: COMMON
  size: 100
region: eu-de
availabilityzone: eu-de-01,eu-de-02
vpc: main-vpc
subnet: db-subnet
securitygroup: db-sg
"#;

#[allow(dead_code)]
pub fn instance_spec() -> InstanceSpec {
    InstanceSpec::from_yaml_str(INSTANCE_DOC).unwrap()
}

/// Provider that knows every network the instance document names
#[allow(dead_code)]
pub fn network_provider() -> MockProvider {
    MockProvider::new()
        .with_vpc("vpc-1", "main-vpc")
        .with_subnet("subnet-1", "db-subnet")
        .with_security_group("sg-1", "db-sg")
}

/// Provider with an existing `mydb` instance
#[allow(dead_code)]
pub fn instance_provider() -> MockProvider {
    MockProvider::new().with_instance(
        Instance::new("abc", "mydb")
            .with_status("ACTIVE")
            .with_private_ip("192.168.0.12"),
    )
}

#[allow(dead_code)]
pub fn error_entries(count: usize) -> Vec<ErrorLogEntry> {
    (0..count)
        .map(|i| ErrorLogEntry {
            time: Some(format!("2024-03-01T10:{:02}:00", i % 60)),
            level: Some("ERROR".to_string()),
            content: Some(format!("entry {}", i)),
            extra: Default::default(),
        })
        .collect()
}

#[allow(dead_code)]
pub fn slow_entry(query: &str) -> SlowLogEntry {
    serde_json::from_value(serde_json::json!({
        "count": "1 (1)",
        "time": "1.50 s",
        "lock_time": "0.00 s",
        "rows_sent": "1",
        "rows_examined": "100000",
        "database": "shop",
        "users": "app",
        "query_sample": query,
        "type": "SELECT",
        "start_time": "2024-03-01T10:00:00Z"
    }))
    .unwrap()
}
