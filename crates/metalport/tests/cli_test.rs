//! Integration tests for the `metalport` CLI binary.
//!
//! Argument parsing, help output, completions and error exit codes run
//! without any API; the rest talk to a wiremock server.
#![allow(clippy::unwrap_used)]

use std::io::Write as _;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `metalport` binary with env isolation.
///
/// Clears all `METALPORT_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn metalport_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("metalport");
    cmd.env("HOME", "/tmp/metalport-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/metalport-cli-test-nonexistent")
        .env_remove("METALPORT_PROFILE")
        .env_remove("METALPORT_ENDPOINT")
        .env_remove("METALPORT_AUTH_TOKEN")
        .env_remove("METALPORT_PROJECT")
        .env_remove("METALPORT_METRO")
        .env_remove("METALPORT_OUTPUT")
        .env_remove("METALPORT_INSECURE")
        .env_remove("METALPORT_TIMEOUT")
        .env_remove("METAL_AUTH_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

/// A command pointed at `endpoint` with a token, so config resolution passes.
fn api_cmd(endpoint: &str) -> assert_cmd::Command {
    let mut cmd = metalport_cmd();
    cmd.args(["--endpoint", endpoint, "--auth-token", "test-token"]);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn declaration_file(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

fn port_body(network_type: &str, vlans: &[&str]) -> serde_json::Value {
    let vlans: Vec<_> = vlans.iter().map(|id| json!({ "id": id })).collect();
    json!({
        "id": "p1",
        "type": "NetworkBondPort",
        "name": "bond0",
        "network_type": network_type,
        "data": { "bonded": true },
        "disbond_operation_supported": true,
        "virtual_networks": vlans,
    })
}

async fn mock_port(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/metal/v1/ports/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = metalport_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    metalport_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("port")
            .and(predicate::str::contains("vlan"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    metalport_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("metalport"));
}

#[test]
fn test_completions_bash() {
    metalport_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_config_path_prints_a_toml_path() {
    metalport_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_apply_requires_bonded_or_file() {
    let output = metalport_cmd()
        .args(["port", "apply", "p1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_vlan_and_vxlan_flags_conflict() {
    let output = metalport_cmd()
        .args(["port", "apply", "p1", "--bonded", "true", "--vlan", "v1", "--vxlan", "1000"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_token_exits_with_auth_code() {
    let output = metalport_cmd()
        .args(["--endpoint", "http://127.0.0.1:9/metal/v1/", "port", "show", "p1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "{}", combined_output(&output));
}

#[test]
fn test_declaration_with_both_lists_is_a_conflict() {
    let file = declaration_file("bonded = true\nvlan_ids = [\"v1\"]\nvxlan_ids = [1000]\n");
    let output = api_cmd("http://127.0.0.1:9/metal/v1/")
        .args(["port", "apply", "p1", "--file"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6), "{}", combined_output(&output));
}

#[test]
fn test_declaration_with_unknown_key_is_rejected() {
    let file = declaration_file("bonded = true\nvlans = [\"v1\"]\n");
    let output = api_cmd("http://127.0.0.1:9/metal/v1/")
        .args(["port", "plan", "p1", "--file"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

#[test]
fn test_reset_without_terminal_needs_yes() {
    let output = api_cmd("http://127.0.0.1:9/metal/v1/")
        .args(["port", "reset", "p1"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_vlan_list_needs_a_project() {
    let output = api_cmd("http://127.0.0.1:9/metal/v1/")
        .args(["vlan", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

#[test]
fn test_release_without_reset_on_delete_makes_no_calls() {
    api_cmd("http://127.0.0.1:9/metal/v1/")
        .args(["port", "release", "p1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("left as it is"));
}

#[test]
fn test_release_with_reset_needs_yes_without_terminal() {
    let file = declaration_file("bonded = true\nreset_on_delete = true\n");
    let output = api_cmd("http://127.0.0.1:9/metal/v1/")
        .args(["port", "release", "p1", "--file"])
        .arg(file.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}

// ── Against a mocked API ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_port_show_json() {
    let server = MockServer::start().await;
    mock_port(&server, port_body("layer3", &["v1"])).await;

    let output = api_cmd(&format!("{}/metal/v1/", server.uri()))
        .args(["-o", "json", "port", "show", "p1"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let port: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(port["id"], "p1");
    assert_eq!(port["network_type"], "layer3");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_port_plan_lists_steps_without_mutating() {
    let server = MockServer::start().await;
    mock_port(&server, port_body("layer3", &["v1", "v2"])).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let output = api_cmd(&format!("{}/metal/v1/", server.uri()))
        .args(["-o", "json", "port", "plan", "p1", "--bonded", "true", "--layer2", "true"])
        .args(["--vlan", "v1"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        plan["steps"],
        json!([
            { "stage": "detach-vlans", "action": "detach-vlan", "vlan": "v2" },
            { "stage": "convert-to-layer2", "action": "convert-to-layer2" },
        ])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_port_not_found_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metal/v1/ports/p1"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Request-Id", "req-1")
                .set_body_json(json!({ "errors": ["Not found"] })),
        )
        .mount(&server)
        .await;

    let output = api_cmd(&format!("{}/metal/v1/", server.uri()))
        .args(["port", "show", "p1"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reset_of_missing_port_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metal/v1/ports/p1"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Request-Id", "req-1")
                .set_body_json(json!({ "errors": ["Not found"] })),
        )
        .mount(&server)
        .await;

    api_cmd(&format!("{}/metal/v1/", server.uri()))
        .args(["--yes", "port", "reset", "p1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing to reset"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_release_with_reset_on_delete_resets_the_port() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metal/v1/ports/p1"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Request-Id", "req-1")
                .set_body_json(json!({ "errors": ["Not found"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    api_cmd(&format!("{}/metal/v1/", server.uri()))
        .args(["--yes", "port", "release", "p1", "--reset-on-delete"])
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing to reset"));
}
