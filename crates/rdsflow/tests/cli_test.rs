#![allow(deprecated)] // TODO: move from Command::cargo_bin to the cargo_bin_cmd! macro

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const ENV_VARS: [&str; 13] = [
    "OS_AUTH_URL",
    "OS_IDENTITY_API_VERSION",
    "OS_REGION_NAME",
    "OS_PROJECT_NAME",
    "OS_USER_DOMAIN_NAME",
    "OS_DOMAIN_NAME",
    "OS_USERNAME",
    "OS_PASSWORD",
    "OS_DEBUG",
    "RDS_NAME",
    "RDS_RESTORE_TIME",
    "RDS_TARGET_NAME",
    "RDS_CONFIG",
];

/// The binary with none of its variables inherited from the caller
fn rdsflow() -> Command {
    let mut cmd = Command::cargo_bin("rdsflow").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_cli_help() {
    rdsflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("logs"))
        .stdout(predicate::str::contains("OS_PASSWORD"))
        .stdout(predicate::str::contains("RDS_RESTORE_TIME"));
}

#[test]
fn test_cli_version() {
    rdsflow()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("rdsflow "));

    rdsflow()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("rdsflow"));
}

#[test]
fn test_logs_help() {
    rdsflow()
        .args(["logs", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--errorlog"))
        .stdout(predicate::str::contains("--slowlog"))
        .stdout(predicate::str::contains("--pagination"));
}

#[test]
fn test_logs_requires_a_log_kind() {
    rdsflow()
        .args(["logs", "--name", "mydb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--errorlog"));
}

#[test]
fn test_logs_without_name() {
    rdsflow()
        .args(["logs", "--errorlog"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing variable RDS_NAME (e.g. mydb)"));
}

#[test]
fn test_logs_rejects_unknown_pagination() {
    rdsflow()
        .args(["logs", "--errorlog", "--pagination", "all"])
        .env("RDS_NAME", "mydb")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown pagination 'all'"));
}

#[test]
fn test_restore_without_time() {
    rdsflow()
        .arg("restore")
        .env("RDS_NAME", "mydb")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Missing variable RDS_RESTORE_TIME (e.g. 2020-04-04T22:08:41+00:00)",
        ));
}

#[test]
fn test_restore_with_unparseable_time() {
    rdsflow()
        .arg("restore")
        .env("RDS_NAME", "mydb")
        .env("RDS_RESTORE_TIME", "yesterday")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Can't parse time format 'yesterday'"));
}

#[test]
fn test_restore_time_is_checked_before_name() {
    rdsflow()
        .arg("restore")
        .env("RDS_RESTORE_TIME", "2020-04-04T22:08:41+00:00")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing variable RDS_NAME"));
}

#[test]
fn test_create_with_missing_config_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("nope.yaml");

    rdsflow()
        .arg("create")
        .arg("--config")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_create_without_any_document() {
    let temp_dir = tempfile::tempdir().unwrap();

    rdsflow()
        .arg("create")
        .current_dir(temp_dir.path())
        .env("HOME", temp_dir.path())
        .env("XDG_CONFIG_HOME", temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR:"));
}

#[test]
fn test_create_with_incomplete_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    let doc = temp_dir.path().join("rds.yaml");
    fs::write(&doc, "name: mydb\nflavorref: rds.mysql.c2.large\n").unwrap();

    rdsflow()
        .arg("create")
        .env("RDS_CONFIG", &doc)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Instance document is missing"));
}

#[test]
fn test_unsupported_identity_version() {
    rdsflow()
        .args(["logs", "--errorlog", "--name", "mydb"])
        .env("OS_IDENTITY_API_VERSION", "2")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported identity API version '2'"));
}

#[test]
fn test_missing_credentials_are_reported_before_any_request() {
    rdsflow()
        .args(["logs", "--errorlog", "--name", "mydb"])
        .env("OS_AUTH_URL", "http://127.0.0.1:9/v3")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OS_USERNAME is not set"));
}
