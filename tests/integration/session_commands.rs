//! Integration tests for `agentvm edit` / `agentvm build` against a stubbed
//! Linode API.
//!
//! A one-shot TCP server plays the provider; `LINODE_API_URL` points the
//! binary at it. Tests cover the failure paths that end a session before any
//! instance boots — the full lifecycle is exercised at the unit level.

#![allow(clippy::expect_used)]

use std::io::{Read, Write};
use std::net::TcpListener;
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

fn project_dir(dir: &TempDir) -> PathBuf {
    let project = dir.path().join("sample-app");
    std::fs::create_dir_all(&project).expect("mkdir");
    project
}

fn write_record(project: &Path) {
    let record = serde_json::json!({
        "project_name": "sample-app",
        "base_image_id": "linode/ubuntu22.04",
        "instance_type": "g6-nanode-1",
        "region": "us-east",
        "created_at": 1_700_000_000,
    });
    std::fs::write(
        project.join(RECORD_FILENAME),
        serde_json::to_string_pretty(&record).expect("serialize"),
    )
    .expect("write record");
}

/// Serve one canned response per incoming connection, in order. Returns the
/// bound port.
fn serve_responses(responses: Vec<Vec<u8>>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    std::thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(&response);
        }
    });
    port
}

fn http_json(status: u16, reason_phrase: &str, body: &str) -> Vec<u8> {
    let mut response = format!(
        "HTTP/1.1 {status} {reason_phrase}\r\nContent-Type: application/json\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body.as_bytes());
    response
}

/// Linode-shaped error body: `{"errors":[{"reason":...}]}`.
fn api_error(status: u16, reason_phrase: &str, reason: &str) -> Vec<u8> {
    http_json(
        status,
        reason_phrase,
        &format!(r#"{{"errors":[{{"reason":"{reason}"}}]}}"#),
    )
}

// ── provider failures exit 2 ─────────────────────────────────────────────────

#[test]
fn test_edit_exits_2_when_create_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir);
    write_record(&project);
    let port = serve_responses(vec![api_error(500, "Internal Server Error", "Server error")]);

    agentvm()
        .arg("edit")
        .current_dir(&project)
        .env("LINODE_TOKEN", "test-token")
        .env("LINODE_API_URL", format!("http://127.0.0.1:{port}"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("creating instance"))
        .stderr(predicate::str::contains("Linode API error (HTTP 500)"));
}

#[test]
fn test_create_conflict_surfaces_the_api_reason() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir);
    write_record(&project);
    let port = serve_responses(vec![api_error(400, "Bad Request", "Label must be unique")]);

    agentvm()
        .arg("build")
        .current_dir(&project)
        .env("LINODE_TOKEN", "test-token")
        .env("LINODE_API_URL", format!("http://127.0.0.1:{port}"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Label must be unique"));
}

#[test]
fn test_unreachable_api_exits_2() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir);
    write_record(&project);

    // Port 1 is never listening: transport error, still a provider failure.
    agentvm()
        .arg("edit")
        .current_dir(&project)
        .env("LINODE_TOKEN", "test-token")
        .env("LINODE_API_URL", "http://127.0.0.1:1")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("could not reach the Linode API"));
}

// ── local failures exit 1 ────────────────────────────────────────────────────

#[test]
fn test_build_continue_with_stopped_instance_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir);
    write_record(&project);
    let port = serve_responses(vec![http_json(
        200,
        "OK",
        r#"{"id":999,"status":"offline","ipv4":[]}"#,
    )]);

    agentvm()
        .args(["build", "--continue", "999"])
        .current_dir(&project)
        .env("LINODE_TOKEN", "test-token")
        .env("LINODE_API_URL", format!("http://127.0.0.1:{port}"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is offline, not running"));
}

#[test]
fn test_missing_token_without_terminal_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir);
    write_record(&project);

    agentvm()
        .arg("edit")
        .current_dir(&project)
        .env_remove("LINODE_TOKEN")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("LINODE_TOKEN"))
        .stderr(predicate::str::contains("cloud.linode.com"));
}

#[test]
fn test_corrupt_record_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    let project = project_dir(&dir);
    std::fs::write(project.join(RECORD_FILENAME), "{not json").expect("write");

    agentvm()
        .arg("edit")
        .current_dir(&project)
        .env("LINODE_TOKEN", "test-token")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("parsing record file"));
}
