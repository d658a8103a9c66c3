//! Smoke tests for the comprobar CLI.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn comprobar() -> Command {
    Command::cargo_bin("comprobar").expect("comprobar binary should exist")
}

const GOOD_PLAYBOOK: &str = r#"
version: "1.0"
name: airlock empty state
mocks:
  - pattern: "**/api/airlock?*"
    body: []
steps:
  - type: navigate
    path: /airlock
  - type: assert
    selector: { type: text, value: "No pending data" }
    expected: { type: visible }
"#;

#[test]
fn test_help_flag() {
    comprobar()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version_flag() {
    comprobar()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_no_args_shows_usage() {
    comprobar().assert().failure();
}

#[test]
fn test_validate_accepts_good_playbook() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("airlock.yaml");
    fs::write(&path, GOOD_PLAYBOOK).unwrap();

    comprobar()
        .arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok"))
        .stdout(predicate::str::contains("2 steps"));
}

#[test]
fn test_validate_rejects_wrong_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, GOOD_PLAYBOOK.replace("\"1.0\"", "\"9.9\"")).unwrap();

    comprobar()
        .arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stdout(predicate::str::contains("unsupported schema version"));
}

#[test]
fn test_validate_rejects_missing_file() {
    comprobar()
        .arg("validate")
        .arg("does-not-exist.yaml")
        .assert()
        .failure();
}

#[test]
fn test_run_requires_files() {
    comprobar().arg("run").assert().failure();
}
