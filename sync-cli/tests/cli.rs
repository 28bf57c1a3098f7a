//! End-to-end tests for the spendsync binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const ADA: &str = r#"{"id":"u1","name":"Ada","currency":"EUR","createdAt":1}"#;

fn spendsync(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("spendsync").unwrap();
    cmd.env_remove("SPENDSYNC_TOKEN")
        .env("RUST_LOG", "warn")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

/// A signed-in device whose remote store lives in `remote`.
fn device(remote: &Path) -> TempDir {
    let dir = tempdir().unwrap();
    let config = format!(
        "[account]\nid = \"acct-1\"\ntoken = \"tok\"\n\n[remote]\ndir = {:?}\n",
        remote.display().to_string()
    );
    std::fs::write(dir.path().join("spendsync.toml"), config).unwrap();
    dir
}

#[test]
fn status_on_fresh_dir() {
    let dir = tempdir().unwrap();

    spendsync(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT SIGNED IN"))
        .stdout(predicate::str::contains("Pending:  0"));
}

#[test]
fn offline_enqueue_stays_pending() {
    let remote = tempdir().unwrap();
    let dir = device(remote.path());

    spendsync(dir.path())
        .args(["--offline", "enqueue", "user", "create", ADA])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued create user"))
        .stdout(predicate::str::contains("continue-offline"));

    spendsync(dir.path())
        .args(["--offline", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:  1"))
        .stdout(predicate::str::contains("user:u1"));

    assert!(!remote.path().join("acct-1").exists());
}

#[test]
fn continue_offline_pushes_queue() {
    let remote = tempdir().unwrap();
    let dir = device(remote.path());

    spendsync(dir.path())
        .args(["--offline", "enqueue", "user", "create", ADA])
        .assert()
        .success();

    spendsync(dir.path())
        .arg("continue-offline")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pushed 1 mutation(s)"));

    assert!(remote.path().join("acct-1/user/u1.json").exists());
    spendsync(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:  0"));
}

#[test]
fn second_device_pulls_records() {
    let remote = tempdir().unwrap();
    let first = device(remote.path());
    let second = device(remote.path());

    spendsync(first.path())
        .arg("continue-offline")
        .assert()
        .success();
    spendsync(first.path())
        .args(["enqueue", "user", "create", ADA])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pushed 1 mutation(s)"));

    spendsync(second.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pulled 1 record(s)"));

    spendsync(second.path())
        .args(["list", "user"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Ada\""));
}

#[test]
fn disabled_sync_keeps_queue() {
    let remote = tempdir().unwrap();
    let dir = device(remote.path());

    spendsync(dir.path())
        .arg("continue-offline")
        .assert()
        .success();
    spendsync(dir.path()).arg("disable").assert().success();
    spendsync(dir.path())
        .args(["enqueue", "user", "create", ADA])
        .assert()
        .success()
        .stdout(predicate::str::contains("SyncDisabled"));

    spendsync(dir.path())
        .arg("enable")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 pending"));
    assert!(remote.path().join("acct-1/user/u1.json").exists());
}

#[test]
fn clear_queue_requires_confirmation() {
    let dir = tempdir().unwrap();

    spendsync(dir.path())
        .arg("clear-queue")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    spendsync(dir.path())
        .args(["clear-queue", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Discarded 0"));
}

#[test]
fn invalid_record_is_refused() {
    let dir = tempdir().unwrap();

    spendsync(dir.path())
        .args(["enqueue", "user", "create", r#"{"id":"u1"}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid record"));

    spendsync(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:  0"));
}

#[test]
fn unknown_kind_is_a_usage_error() {
    let dir = tempdir().unwrap();

    spendsync(dir.path())
        .args(["list", "invoice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown entity type"));
}
