mod common;

use chrono::{TimeZone, Utc};
use common::{error_entries, instance_provider, slow_entry};
use rdsflow_cloud::mock::{MockCall, MockProvider};
use rdsflow_cloud::{ErrorLogEntry, LogQuery, SlowLogEntry};
use rdsflow_core::{CoreError, LogEntries, LogFetcher, LogKind, LogWindow, Pagination};

fn window() -> LogWindow {
    LogWindow::last_month(Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap())
}

fn error_log_queries(provider: &MockProvider) -> Vec<LogQuery> {
    provider
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            MockCall::ListErrorLogs { query, .. } => Some(query),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_multi_page_collects_every_entry_in_order() {
    let provider = instance_provider().with_error_logs(error_entries(250));

    let entries = LogFetcher::new(&provider)
        .fetch_error_logs("abc", &window())
        .await
        .unwrap();

    assert_eq!(entries.len(), 250);
    assert_eq!(entries[0].content.as_deref(), Some("entry 0"));
    assert_eq!(entries[249].content.as_deref(), Some("entry 249"));

    let queries = error_log_queries(&provider);
    assert_eq!(
        queries.iter().map(|q| q.page).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(queries.iter().all(|q| q.limit == 100));
    assert_eq!(queries[0].start_date, "2024-02-29T12:00:00+0000");
    assert_eq!(queries[0].end_date, "2024-03-31T12:00:00+0000");
}

#[tokio::test]
async fn test_single_page_makes_exactly_one_request() {
    let provider = instance_provider().with_error_logs(error_entries(250));

    let entries = LogFetcher::new(&provider)
        .with_pagination(Pagination::SinglePage)
        .fetch_error_logs("abc", &window())
        .await
        .unwrap();

    assert_eq!(entries.len(), 100);
    assert_eq!(error_log_queries(&provider).len(), 1);
    assert_eq!(error_log_queries(&provider)[0].page, 1);
}

#[tokio::test]
async fn test_single_page_returns_everything_when_provider_ignores_paging() {
    let provider = instance_provider()
        .with_error_logs(error_entries(250))
        .ignoring_log_paging();

    let entries = LogFetcher::new(&provider)
        .with_pagination(Pagination::SinglePage)
        .fetch_error_logs("abc", &window())
        .await
        .unwrap();

    assert_eq!(entries.len(), 250);
}

#[tokio::test]
async fn test_multi_page_stops_on_first_full_response() {
    let provider = instance_provider()
        .with_error_logs(error_entries(250))
        .ignoring_log_paging();

    let entries = LogFetcher::new(&provider)
        .fetch_error_logs("abc", &window())
        .await
        .unwrap();

    assert_eq!(entries.len(), 250);
    assert_eq!(error_log_queries(&provider).len(), 1);
}

#[tokio::test]
async fn test_empty_log() {
    let provider = instance_provider();

    let entries = LogFetcher::new(&provider)
        .fetch_slow_logs("abc", &window())
        .await
        .unwrap();

    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_fetch_for_instance_resolves_name_first() {
    let provider = instance_provider().with_slow_logs(vec![slow_entry("SELECT 1")]);

    let entries = LogFetcher::new(&provider)
        .fetch_for_instance("mydb", LogKind::Slow, &window())
        .await
        .unwrap();

    assert_eq!(entries.kind(), LogKind::Slow);
    assert_eq!(entries.len(), 1);
    assert!(matches!(
        provider.calls().last(),
        Some(MockCall::ListSlowLogs { instance_id, .. }) if instance_id == "abc"
    ));
}

#[tokio::test]
async fn test_fetch_for_unknown_instance() {
    let provider = instance_provider();

    let err = LogFetcher::new(&provider)
        .fetch_for_instance("nodb", LogKind::Error, &window())
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound { .. }));
    assert!(error_log_queries(&provider).is_empty());
}

#[test]
fn test_slow_log_dump_keeps_every_field() {
    let mut entry = slow_entry("SELECT * FROM orders");
    entry
        .extra
        .insert("client_ip".to_string(), serde_json::json!("10.0.0.7"));
    let entries = LogEntries::Slow(vec![entry, slow_entry("SELECT 2")]);

    let dump = entries.to_pretty_json().unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&dump).unwrap();

    assert_eq!(reparsed[0]["query_sample"], "SELECT * FROM orders");
    assert_eq!(reparsed[0]["type"], "SELECT");
    assert_eq!(reparsed[0]["rows_examined"], "100000");
    assert_eq!(reparsed[0]["client_ip"], "10.0.0.7");
    assert_eq!(reparsed[1]["query_sample"], "SELECT 2");

    // Known fields first, in a stable order, two-space indent
    assert!(dump.starts_with("[\n  {\n    \"count\": \"1 (1)\",\n    \"time\": \"1.50 s\""));
}

#[test]
fn test_error_log_dump_field_order() {
    let entries = LogEntries::Error(vec![ErrorLogEntry {
        time: Some("2024-03-01T10:00:00".to_string()),
        level: Some("ERROR".to_string()),
        content: Some("Aborted connection".to_string()),
        extra: Default::default(),
    }]);

    assert_eq!(
        entries.to_pretty_json().unwrap(),
        "[\n  {\n    \"time\": \"2024-03-01T10:00:00\",\n    \"level\": \"ERROR\",\n    \"content\": \"Aborted connection\"\n  }\n]"
    );
}

#[test]
fn test_dump_keeps_null_fields() {
    let slow: SlowLogEntry = serde_json::from_value(serde_json::json!({
        "count": "1",
        "database": null,
        "query_sample": "SELECT 1"
    }))
    .unwrap();
    let error: ErrorLogEntry = serde_json::from_value(serde_json::json!({
        "time": "2024-03-01T10:00:00",
        "level": null,
        "content": "Aborted connection"
    }))
    .unwrap();

    let slow_dump: serde_json::Value =
        serde_json::from_str(&LogEntries::Slow(vec![slow]).to_pretty_json().unwrap()).unwrap();
    let error_dump: serde_json::Value =
        serde_json::from_str(&LogEntries::Error(vec![error]).to_pretty_json().unwrap()).unwrap();

    let slow_record = slow_dump[0].as_object().unwrap();
    assert!(slow_record.contains_key("database"));
    assert!(slow_record["database"].is_null());
    assert_eq!(slow_record["query_sample"], "SELECT 1");

    let error_record = error_dump[0].as_object().unwrap();
    assert!(error_record.contains_key("level"));
    assert!(error_record["level"].is_null());
}

#[test]
fn test_dump_writes_every_known_slow_log_field() {
    let entry: SlowLogEntry =
        serde_json::from_value(serde_json::json!({"query_sample": "SELECT 1"})).unwrap();
    let dump: serde_json::Value =
        serde_json::from_str(&LogEntries::Slow(vec![entry]).to_pretty_json().unwrap()).unwrap();

    let record = dump[0].as_object().unwrap();
    for field in [
        "count",
        "time",
        "lock_time",
        "rows_sent",
        "rows_examined",
        "database",
        "users",
        "query_sample",
        "type",
        "start_time",
    ] {
        assert!(record.contains_key(field), "{} missing from dump", field);
    }
}
