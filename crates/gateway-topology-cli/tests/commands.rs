// crates/gateway-topology-cli/tests/commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests driving the gateway-topology binary.
// Purpose: Ensure commands compose, render, resolve, and simulate correctly.
// Dependencies: gateway-topology binary, gateway-topology-core, serde_json, tempfile
// ============================================================================

//! CLI command integration tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use gateway_topology_core::TopologyManifest;
use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const CONFIG: &str = r#"
[environment]
account = "123456789012"
region = "us-east-1"

[audit]
sink = "none"
"#;

fn gateway_topology_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_gateway-topology"))
}

/// Creates an asset root holding `src/app.py` and a config file.
fn workspace(config: &str, with_entry_point: bool) -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    if with_entry_point {
        fs::create_dir_all(dir.path().join("src")).expect("src dir");
        fs::write(dir.path().join("src/app.py"), "def handler(event, context):\n    pass\n")
            .expect("write handler");
    }
    fs::write(dir.path().join("gateway-topology.toml"), config).expect("write config");
    dir
}

fn run(root: &Path, args: &[&str]) -> Output {
    let config = root.join("gateway-topology.toml");
    Command::new(gateway_topology_bin())
        .arg("--config")
        .arg(&config)
        .arg("--asset-root")
        .arg(root)
        .args(args)
        .env_remove("GATEWAY_TOPOLOGY_LANG")
        .output()
        .expect("run gateway-topology")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// SECTION: Composition Commands
// ============================================================================

#[test]
fn synth_emits_verifiable_manifest() {
    let root = workspace(CONFIG, true);
    let output = run(root.path(), &["synth"]);
    assert!(output.status.success(), "stderr: {}", stderr_text(&output));

    let manifest: TopologyManifest =
        serde_json::from_slice(&output.stdout).expect("manifest json");
    assert!(manifest.verify_fingerprint().unwrap());
    let url = manifest.output("URL").expect("url output");
    assert!(url.value.ends_with(".execute-api.us-east-1.amazonaws.com/dev/"));
}

#[test]
fn synth_writes_manifest_file() {
    let root = workspace(CONFIG, true);
    let target = root.path().join("manifest.json");
    let output = run(root.path(), &["synth", "--output", target.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr_text(&output));
    assert!(stdout_text(&output).starts_with("Wrote manifest "));

    let written: TopologyManifest =
        serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert!(stdout_text(&output).contains(&written.fingerprint.value));
}

#[test]
fn order_lists_output_last() {
    let root = workspace(CONFIG, true);
    let output = run(root.path(), &["order"]);
    assert!(output.status.success());
    let text = stdout_text(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.last().copied(), Some("output/URL"));
    let nested = lines.iter().position(|line| *line == "nested/FastapiStack").unwrap();
    assert_eq!(nested, lines.len() - 2);
}

#[test]
fn url_prints_primary_stage_endpoint() {
    let root = workspace(CONFIG, true);
    let output = run(root.path(), &["url"]);
    assert!(output.status.success());
    let url = stdout_text(&output);
    assert!(url.starts_with("https://"));
    assert!(url.trim_end().ends_with("/dev/"));
}

#[test]
fn missing_entry_point_fails_composition() {
    let root = workspace(CONFIG, false);
    let output = run(root.path(), &["synth"]);
    assert!(!output.status.success());
    assert!(stderr_text(&output).contains("Composition failed (configuration)"));
    assert!(output.stdout.is_empty());
}

// ============================================================================
// SECTION: Request Commands
// ============================================================================

#[test]
fn resolve_reports_greedy_capture() {
    let root = workspace(CONFIG, true);
    let output =
        run(root.path(), &["resolve", "--stage", "prod", "--method", "get", "--path", "/items/1"]);
    assert!(output.status.success(), "stderr: {}", stderr_text(&output));
    let report = stdout_json(&output);
    assert_eq!(report["pattern"], "/{proxy+}");
    assert_eq!(report["target"], "unit/fastapi_sample");
    assert_eq!(report["captures"]["proxy_path"], "items/1");
}

#[test]
fn resolve_without_match_fails() {
    let root = workspace(CONFIG, true);
    let output =
        run(root.path(), &["resolve", "--stage", "dev", "--method", "DELETE", "--path", "/items"]);
    assert!(!output.status.success());
    assert!(stderr_text(&output).contains("No route matches DELETE /items on stage dev."));
}

#[test]
fn invoke_with_declared_key_is_served() {
    let root = workspace(CONFIG, true);
    let output = run(root.path(), &[
        "invoke",
        "--stage",
        "dev",
        "--path",
        "/items/42",
        "--api-key-name",
        "fastapi-sample-apikey",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr_text(&output));
    let outcome = stdout_json(&output);
    assert_eq!(outcome["outcome"], "invoked");
    assert_eq!(outcome["unit"], "unit/fastapi_sample");
}

#[test]
fn invoke_without_key_is_forbidden() {
    let root = workspace(CONFIG, true);
    let output = run(root.path(), &["invoke", "--stage", "dev", "--path", "/items"]);
    assert!(!output.status.success());
    assert_eq!(stdout_json(&output)["outcome"], "forbidden");
}

#[test]
fn invoke_public_docs_route_needs_no_key() {
    let root = workspace(CONFIG, true);
    let output = run(root.path(), &["invoke", "--stage", "dev", "--path", "/docs"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["outcome"], "invoked");
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

#[test]
fn config_example_round_trips_through_validate() {
    let root = workspace(CONFIG, true);
    let example = run(root.path(), &["config", "example"]);
    assert!(example.status.success());
    let example_path = root.path().join("example.toml");
    fs::write(&example_path, &example.stdout).unwrap();

    let output = Command::new(gateway_topology_bin())
        .args(["config", "validate", "--config", example_path.to_str().unwrap()])
        .env_remove("GATEWAY_TOPOLOGY_LANG")
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", stderr_text(&output));
    assert_eq!(stdout_text(&output).trim(), "Config is valid.");
}

#[test]
fn config_validate_rejects_bad_account() {
    let root = workspace("[environment]\naccount = \"42\"\nregion = \"us-east-1\"\n", true);
    let output = run(root.path(), &["config", "validate"]);
    assert!(!output.status.success());
    assert!(stderr_text(&output).contains("Failed to load config"));
}

#[test]
fn catalan_output_is_selected_by_flag() {
    let root = workspace(CONFIG, true);
    let output = run(root.path(), &["--lang", "ca", "config", "validate"]);
    assert!(output.status.success());
    assert_eq!(stdout_text(&output).trim(), "La configuració és vàlida.");
    assert!(stderr_text(&output).contains("traduïda automàticament"));
}

#[test]
fn invalid_language_env_is_rejected() {
    let root = workspace(CONFIG, true);
    let output = Command::new(gateway_topology_bin())
        .arg("--config")
        .arg(root.path().join("gateway-topology.toml"))
        .args(["config", "validate"])
        .env("GATEWAY_TOPOLOGY_LANG", "xx")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr_text(&output).contains("GATEWAY_TOPOLOGY_LANG"));
}
