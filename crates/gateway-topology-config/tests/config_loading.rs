//! Config file loading tests for gateway-topology-config.
// crates/gateway-topology-config/tests/config_loading.rs
// =============================================================================
// Module: Config Loading Tests
// Description: Validate file reading limits and error classification.
// Purpose: Ensure config loading fails closed on unreadable or oversized input.
// =============================================================================

use gateway_topology_config::ConfigError;
use gateway_topology_config::TopologyConfig;
use gateway_topology_config::config_toml_example;

mod common;

type TestResult = Result<(), String>;

#[test]
fn explicit_file_is_loaded() -> TestResult {
    let (_dir, path) = common::write_config("topology.toml", config_toml_example().as_bytes())?;
    let config = TopologyConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    if config.environment.account.as_deref() != Some("123456789012") {
        return Err("environment account was not loaded".to_string());
    }
    Ok(())
}

#[test]
fn missing_explicit_file_is_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("absent.toml");
    match TopologyConfig::load(Some(&path)) {
        Err(ConfigError::Io(_)) => Ok(()),
        Err(other) => Err(format!("expected io error, got {other}")),
        Ok(_) => Err("expected io error".to_string()),
    }
}

#[test]
fn oversized_file_is_rejected() -> TestResult {
    let mut contents = b"# padding\n".repeat(110_000);
    contents.extend_from_slice(b"[audit]\nsink = \"none\"\n");
    let (_dir, path) = common::write_config("large.toml", &contents)?;
    common::assert_invalid(TopologyConfig::load(Some(&path)), "exceeds size limit")
}

#[test]
fn non_utf8_file_is_rejected() -> TestResult {
    let (_dir, path) = common::write_config("binary.toml", &[0xff, 0xfe, 0x00, 0x41])?;
    common::assert_invalid(TopologyConfig::load(Some(&path)), "must be utf-8")
}

#[test]
fn malformed_toml_is_a_parse_error() -> TestResult {
    let (_dir, path) = common::write_config("broken.toml", b"[topology\nisolation = 1")?;
    match TopologyConfig::load(Some(&path)) {
        Err(ConfigError::Parse(_)) => Ok(()),
        Err(other) => Err(format!("expected parse error, got {other}")),
        Ok(_) => Err("expected parse error".to_string()),
    }
}

#[test]
fn overlong_path_component_is_rejected() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("a".repeat(300));
    common::assert_invalid(TopologyConfig::load(Some(&path)), "component too long")
}

#[test]
fn invalid_topology_fails_on_load() -> TestResult {
    let (_dir, path) = common::write_config(
        "invalid.toml",
        b"[topology.function]\nname = \"\"\n",
    )?;
    common::assert_invalid(TopologyConfig::load(Some(&path)), "function.name must be non-empty")
}
