//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_fixtures(dir: &Path) {
    let mapping = dir.join("mapping");
    fs::create_dir_all(&mapping).unwrap();
    fs::write(
        mapping.join("status.csv"),
        "server_id,name\n10001,In Progress\n10002,Done\n",
    )
    .unwrap();
    fs::write(
        mapping.join("users.csv"),
        "server_id,name\nJIRAUSER12345,jane@example.com\n",
    )
    .unwrap();
    fs::write(
        mapping.join("customFields.csv"),
        "server_id,name\n10001,Team\n",
    )
    .unwrap();

    fs::write(
        dir.join("cloud.csv"),
        "category,name,cloud_id\n\
         status,In Progress,3\n\
         users,jane@example.com,abc-123\n\
         customFields,Team,customfield_10020\n",
    )
    .unwrap();

    let export = json!({"rules": [
        {"id": 1, "name": "Old rule", "state": "DISABLED"},
        {"id": 2, "name": "Escalate", "state": "ENABLED",
         "conditions": [{"field": "status", "value": "10001"}],
         "action": {"destinationStatus": {"type": "ID", "value": "10002"}},
         "comment": "ping JIRAUSER12345"},
    ]});
    fs::write(dir.join("export.json"), serde_json::to_string(&export).unwrap()).unwrap();
}

fn jira_migrate() -> Command {
    Command::cargo_bin("jira-migrate").unwrap()
}

#[test]
fn test_convert_end_to_end() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());

    jira_migrate()
        .current_dir(dir.path())
        .args([
            "convert",
            "export.json",
            "--mapping",
            "mapping",
            "--cloud-index",
            "cloud.csv",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted"))
        .stdout(predicate::str::contains("1 disabled dropped"));

    // disabled rule removed, identifiers rewritten
    let raw = fs::read_to_string(dir.path().join("export.json-modified-for-cloud.json")).unwrap();
    let converted: Value = serde_json::from_str(&raw).unwrap();
    let rules = converted["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["conditions"][0]["value"], json!("3"));
    // Done is missing on Cloud: typed node falls back to a NAME reference
    assert_eq!(rules[0]["action"]["destinationStatus"]["type"], json!("NAME"));
    assert_eq!(rules[0]["action"]["destinationStatus"]["value"], json!("Done"));
    assert_eq!(rules[0]["comment"], json!("ping abc-123"));
    assert_eq!(converted["cloud"], json!(false));

    // pretty variants and the original backup exist
    assert!(dir.path().join("export.json-modified-for-cloud-pretty.json").is_file());
    assert!(dir.path().join("export.json-original-pretty.json").is_file());

    // report flags the missing status
    let report = fs::read_to_string(dir.path().join("mapping-result.csv")).unwrap();
    assert!(report.starts_with("Type,Name,Server ID,Cloud ID,Missing?"));
    assert!(report.contains("status,In Progress,10001,3,NO"));
    assert!(report.contains("status,Done,10002,,YES"));
}

#[test]
fn test_convert_split_writes_one_file_per_rule() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());

    jira_migrate()
        .current_dir(dir.path())
        .args([
            "convert",
            "export.json",
            "--cloud-index",
            "cloud.csv",
            "--split",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("File created"));

    let raw = fs::read_to_string(dir.path().join("1-2-modified-for-cloud.json")).unwrap();
    let part: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(part["rules"][0]["name"], json!("1 - Escalate"));
}

#[test]
fn test_convert_requires_cloud_source() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());

    jira_migrate()
        .current_dir(dir.path())
        .args(["convert", "export.json", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--cloud-index"));
}

#[test]
fn test_convert_rejects_malformed_export() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());
    fs::write(dir.path().join("bad.json"), r#"{"rules": "not-an-array"}"#).unwrap();

    jira_migrate()
        .current_dir(dir.path())
        .args(["convert", "bad.json", "--cloud-index", "cloud.csv", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rules"));
}

#[test]
fn test_check_fails_without_lookup_tables() {
    let dir = tempdir().unwrap();

    jira_migrate()
        .current_dir(dir.path())
        .args(["check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing requirements"));
}

#[test]
fn test_check_passes_with_fixtures() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());

    jira_migrate()
        .current_dir(dir.path())
        .args(["check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lookup tables"))
        .stdout(predicate::str::contains("rule export"));
}

#[test]
fn test_info_reports_rule_counts() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());

    jira_migrate()
        .current_dir(dir.path())
        .args(["info", "export.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rules:    2"))
        .stdout(predicate::str::contains("Disabled: 1"));
}

#[test]
fn test_info_json_output() {
    let dir = tempdir().unwrap();
    write_fixtures(dir.path());

    let output = jira_migrate()
        .current_dir(dir.path())
        .args(["info", "export.json", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["rules"], json!(2));
    assert_eq!(summary["enabled"], json!(1));
    assert_eq!(summary["disabled"], json!(1));
}
