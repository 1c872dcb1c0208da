//! Integration tests for the `meshdeck` binary.
//!
//! Argument parsing, completions, config handling and exit codes, plus one
//! end-to-end run against a mock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// The binary with every `MESHDECK_*` variable cleared and the config file
/// pointed into `dir`.
fn meshdeck_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("meshdeck");
    cmd.env("MESHDECK_CONFIG", dir.join("config.toml"))
        .env_remove("MESHDECK_PROFILE")
        .env_remove("MESHDECK_SERVER")
        .env_remove("MESHDECK_TOKEN")
        .env_remove("MESHDECK_OUTPUT")
        .env_remove("MESHDECK_INSECURE")
        .env_remove("MESHDECK_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = meshdeck_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("networks")
            .and(predicate::str::contains("hosts"))
            .and(predicate::str::contains("relays"))
            .and(predicate::str::contains("ext-clients")),
    );
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("meshdeck"));
}

#[test]
fn test_subcommand_help() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["egress", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create").and(predicate::str::contains("delete")));
}

#[test]
fn test_invalid_subcommand() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .arg("frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_invalid_output_format() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["--output", "xml", "networks", "list"])
        .assert()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("meshdeck"));
}

#[test]
fn test_completions_zsh() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef meshdeck"));
}

#[test]
fn test_completions_fish() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_no_config_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = meshdeck_cmd(dir.path())
        .args(["networks", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("config init"));
}

#[test]
fn test_server_without_token_is_an_auth_error() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["--server", "http://127.0.0.1:9", "networks", "list"])
        .assert()
        .code(3);
}

#[test]
fn test_unknown_profile() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["--profile", "nope", "networks", "list"])
        .assert()
        .code(4);
}

#[test]
fn test_invalid_input_fails_before_connecting() {
    // Port 9 has nothing listening; a connection attempt would exit 7.
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args([
            "--server",
            "http://127.0.0.1:9",
            "--token",
            "x",
            "networks",
            "create",
            "Bad Name",
            "--ipv4",
            "10.101.0.0/16",
        ])
        .assert()
        .code(2);
}

// ── Config subcommands ──────────────────────────────────────────────

#[test]
fn test_config_set_then_show_masks_secrets() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["config", "set", "server", "https://mesh.example.com"])
        .assert()
        .success();
    meshdeck_cmd(dir.path())
        .args(["config", "set", "token", "very-secret"])
        .assert()
        .success();
    assert!(dir.path().join("config.toml").exists());

    meshdeck_cmd(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://mesh.example.com")
                .and(predicate::str::contains("****"))
                .and(predicate::str::contains("very-secret").not()),
        );

    meshdeck_cmd(dir.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));
}

#[test]
fn test_config_set_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["config", "set", "colour", "blue"])
        .assert()
        .code(2);
}

#[test]
fn test_config_use_unknown_profile() {
    let dir = TempDir::new().unwrap();
    meshdeck_cmd(dir.path())
        .args(["config", "use", "staging"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("staging"));
}

// ── End to end ──────────────────────────────────────────────────────

async fn mount_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_networks_list_against_mock_server() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/api/networks",
        json!([{ "netid": "office", "addressrange": "10.101.0.0/16" }]),
    )
    .await;
    mount_get(&server, "/api/hosts", json!([])).await;
    mount_get(&server, "/api/nodes", json!([])).await;
    mount_get(&server, "/api/users", json!([])).await;

    let dir = TempDir::new().unwrap();
    let output = meshdeck_cmd(dir.path())
        .args([
            "--server",
            &server.uri(),
            "--token",
            "master-key",
            "--output",
            "plain",
            "networks",
            "list",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "office");
}
