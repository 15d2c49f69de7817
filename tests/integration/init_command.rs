//! Integration tests for `agentvm init` — record creation in a project
//! directory.
//!
//! Each test runs the binary inside its own `TempDir` so records never leak
//! between tests or into the repository.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RECORD_FILENAME: &str = ".agentvm.json";

fn agentvm() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("agentvm"));
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Create `<tempdir>/<name>` to act as the project directory.
fn project_dir(dir: &TempDir, name: &str) -> PathBuf {
    let project = dir.path().join(name);
    std::fs::create_dir_all(&project).expect("mkdir");
    project
}

fn read_record(project: &Path) -> serde_json::Value {
    let raw = std::fs::read_to_string(project.join(RECORD_FILENAME)).expect("record file");
    serde_json::from_str(&raw).expect("record json")
}

// ── creation ─────────────────────────────────────────────────────────────────

#[test]
fn test_init_writes_record_with_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir, "sample-app");

    agentvm()
        .arg("init")
        .current_dir(&project)
        .assert()
        .success()
        .stdout(predicate::str::contains("initialized environment for sample-app"));

    let record = read_record(&project);
    assert_eq!(record["project_name"], "sample-app");
    assert_eq!(record["base_image_id"], "linode/ubuntu22.04");
    assert_eq!(record["instance_type"], "g6-nanode-1");
    assert_eq!(record["region"], "us-east");
    assert!(record["created_at"].as_i64().expect("created_at") > 0);
    assert!(
        record.get("root_password").is_none(),
        "records must never carry credentials"
    );
}

#[test]
fn test_init_honors_flag_overrides() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir, "sample-app");

    agentvm()
        .args([
            "init",
            "--image",
            "private/777",
            "--type",
            "g6-standard-4",
            "--region",
            "eu-west",
        ])
        .current_dir(&project)
        .assert()
        .success();

    let record = read_record(&project);
    assert_eq!(record["base_image_id"], "private/777");
    assert_eq!(record["instance_type"], "g6-standard-4");
    assert_eq!(record["region"], "eu-west");
}

#[cfg(unix)]
#[test]
fn test_record_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir, "sample-app");

    agentvm().arg("init").current_dir(&project).assert().success();

    let mode = std::fs::metadata(project.join(RECORD_FILENAME))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

// ── re-initialization ────────────────────────────────────────────────────────

#[test]
fn test_init_twice_exits_1_with_remediation() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir, "sample-app");

    agentvm().arg("init").current_dir(&project).assert().success();
    agentvm()
        .arg("init")
        .current_dir(&project)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_init_with_empty_image_writes_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir, "sample-app");

    agentvm()
        .args(["init", "--image", ""])
        .current_dir(&project)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("base_image_id"));

    assert!(!project.join(RECORD_FILENAME).exists());
}

// ── sessions require a record ────────────────────────────────────────────────

#[test]
fn test_edit_without_record_points_at_init() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir, "sample-app");

    agentvm()
        .arg("edit")
        .current_dir(&project)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No environment record found"))
        .stderr(predicate::str::contains("agentvm init"));
}

#[test]
fn test_build_without_record_points_at_init() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir, "sample-app");

    agentvm()
        .arg("build")
        .current_dir(&project)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No environment record found"));
}

// ── property tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        /// The record's project name always equals the directory name.
        #[test]
        fn prop_project_name_follows_directory(name in "[a-z][a-z0-9-]{1,16}") {
            let dir = TempDir::new().expect("tempdir");
            let project = project_dir(&dir, &name);

            agentvm().arg("init").current_dir(&project).assert().success();

            let record = read_record(&project);
            prop_assert_eq!(record["project_name"].as_str(), Some(name.as_str()));
        }
    }
}
