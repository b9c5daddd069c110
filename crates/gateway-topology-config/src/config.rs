// crates/gateway-topology-config/src/config.rs
// ============================================================================
// Module: Gateway Topology Configuration
// Description: Configuration loading and validation for topology composition.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: gateway-topology-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file carries the deployment environment, the audit sink, and the full
//! topology declaration. When no path is given and the default file does not
//! exist, every section falls back to its default; an explicitly named file
//! that cannot be read is an error.
//!
//! Environment values missing from the file are resolved from the process
//! environment (`AWS_ACCOUNT_ID`, `AWS_REGION`, `AWS_DEFAULT_REGION`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use gateway_topology_core::DeploymentEnvironment;
use gateway_topology_core::TopologySpec;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "gateway-topology.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "GATEWAY_TOPOLOGY_CONFIG";
/// Environment variable supplying the account when the file omits it.
pub(crate) const ACCOUNT_ENV_VAR: &str = "AWS_ACCOUNT_ID";
/// Environment variables supplying the region, in lookup order.
pub(crate) const REGION_ENV_VARS: [&str; 2] = ["AWS_REGION", "AWS_DEFAULT_REGION"];
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Gateway topology configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyConfig {
    /// Deployment environment.
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Composition audit sink.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Topology declaration.
    #[serde(default)]
    pub topology: TopologySpec,
}

impl TopologyConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if !explicit && err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(ConfigError::Io(format!("{}: {err}", resolved.display())));
            }
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.environment.validate()?;
        self.audit.validate()?;
        self.topology.validate().map_err(|err| ConfigError::Invalid(format!("topology: {err}")))
    }

    /// Resolves the deployment environment against the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is missing or malformed.
    pub fn deployment_environment(&self) -> Result<DeploymentEnvironment, ConfigError> {
        self.environment.resolve()
    }
}

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Account and region for composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Twelve-digit account identifier.
    #[serde(default)]
    pub account: Option<String>,
    /// Region name.
    #[serde(default)]
    pub region: Option<String>,
}

impl EnvironmentConfig {
    /// Validates values that are present in the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a present value is malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probe_account = self.account.as_deref().unwrap_or("000000000000");
        let probe_region = self.region.as_deref().unwrap_or("us-east-1");
        DeploymentEnvironment::new(probe_account, probe_region)
            .map(|_| ())
            .map_err(|err| ConfigError::Invalid(format!("environment: {err}")))
    }

    /// Resolves the environment, falling back to process variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is missing or malformed.
    pub fn resolve(&self) -> Result<DeploymentEnvironment, ConfigError> {
        self.resolve_with(|name| env::var(name).ok())
    }

    /// Resolves the environment using `lookup` for missing values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a value is missing or malformed.
    pub fn resolve_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<DeploymentEnvironment, ConfigError> {
        let account = self
            .account
            .clone()
            .or_else(|| lookup(ACCOUNT_ENV_VAR).filter(|value| !value.is_empty()))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "environment.account is not set and {ACCOUNT_ENV_VAR} is empty"
                ))
            })?;
        let region = self
            .region
            .clone()
            .or_else(|| {
                REGION_ENV_VARS
                    .iter()
                    .find_map(|name| lookup(name).filter(|value| !value.is_empty()))
            })
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "environment.region is not set and {} are empty",
                    REGION_ENV_VARS.join("/")
                ))
            })?;
        DeploymentEnvironment::new(account, region)
            .map_err(|err| ConfigError::Invalid(format!("environment: {err}")))
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Destination of composition audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
    /// Events are discarded.
    None,
}

/// Audit sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Output path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates sink/path consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the file sink lacks a valid path
    /// or another sink sets one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, self.path.as_deref()) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O errors while reading config.
    #[error("config io error: {0}")]
    Io(String),
    /// Parsing errors.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Validation errors.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Path Helpers
// ============================================================================

/// Resolves the config path; the flag is true when the path was named explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic_in_result_fn,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test assertions may panic inside Result-returning tests."
    )]

    use super::*;

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let result = validate_path_string("audit.path", "   ");
        assert!(result.unwrap_err().to_string().contains("non-empty"));
    }

    #[test]
    fn validate_path_rejects_long_component() {
        let long = "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1);
        let result = validate_path(Path::new(&long));
        assert!(result.unwrap_err().to_string().contains("component too long"));
    }

    #[test]
    fn explicit_path_is_flagged() {
        let (path, explicit) = resolve_path(Some(Path::new("custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("custom.toml"));
        assert!(explicit);
    }

    #[test]
    fn region_lookup_prefers_first_variable() {
        let config = EnvironmentConfig {
            account: Some("123456789012".to_string()),
            region: None,
        };
        let resolved = config
            .resolve_with(|name| match name {
                "AWS_REGION" => Some("eu-west-1".to_string()),
                "AWS_DEFAULT_REGION" => Some("us-west-2".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(resolved.region, "eu-west-1");
    }
}
