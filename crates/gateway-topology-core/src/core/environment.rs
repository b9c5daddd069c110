// crates/gateway-topology-core/src/core/environment.rs
// ============================================================================
// Module: Deployment Environment
// Description: Account and region context for a composition pass.
// Purpose: Carry the only external inputs the composition requires.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The composition needs an account and a region to render scope ARNs and the
//! public endpoint URL. Resolution of those values is performed by the
//! caller's environment; this type only validates their shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::TopologyError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Partition used when rendering ARNs.
pub const DEFAULT_PARTITION: &str = "aws";
/// Required account identifier length.
const ACCOUNT_ID_LENGTH: usize = 12;
/// Maximum region name length.
const MAX_REGION_LENGTH: usize = 32;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Account/region context for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEnvironment {
    /// Twelve-digit account identifier.
    pub account: String,
    /// Region name, e.g. `ap-northeast-1`.
    pub region: String,
}

impl DeploymentEnvironment {
    /// Creates a validated environment.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the account or region is malformed.
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, TopologyError> {
        let environment = Self {
            account: account.into(),
            region: region.into(),
        };
        environment.validate()?;
        Ok(environment)
    }

    /// Validates the account and region shapes.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the account or region is malformed.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.account.len() != ACCOUNT_ID_LENGTH
            || !self.account.chars().all(|ch| ch.is_ascii_digit())
        {
            return Err(TopologyError::Configuration(format!(
                "account must be {ACCOUNT_ID_LENGTH} digits, got {:?}",
                self.account
            )));
        }
        if !is_region_name(&self.region) {
            return Err(TopologyError::Configuration(format!(
                "region must look like `us-east-1`, got {:?}",
                self.region
            )));
        }
        Ok(())
    }
}

/// Returns true for `<area>-<name>-<digit>` style region names.
fn is_region_name(region: &str) -> bool {
    if region.is_empty() || region.len() > MAX_REGION_LENGTH {
        return false;
    }
    let parts: Vec<&str> = region.split('-').collect();
    if parts.len() < 3 {
        return false;
    }
    let Some((last, head)) = parts.split_last() else {
        return false;
    };
    !last.is_empty()
        && last.chars().all(|ch| ch.is_ascii_digit())
        && head.iter().all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_lowercase()))
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

    use super::DeploymentEnvironment;

    #[test]
    fn accepts_well_formed_environment() {
        assert!(DeploymentEnvironment::new("123456789012", "ap-northeast-1").is_ok());
        assert!(DeploymentEnvironment::new("123456789012", "us-gov-west-1").is_ok());
    }

    #[test]
    fn rejects_malformed_account_and_region() {
        assert!(DeploymentEnvironment::new("1234", "us-east-1").is_err());
        assert!(DeploymentEnvironment::new("12345678901a", "us-east-1").is_err());
        assert!(DeploymentEnvironment::new("123456789012", "useast1").is_err());
        assert!(DeploymentEnvironment::new("123456789012", "US-EAST-1").is_err());
    }
}
