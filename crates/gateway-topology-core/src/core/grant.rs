// crates/gateway-topology-core/src/core/grant.rs
// ============================================================================
// Module: Invocation Grants
// Description: Stage- and route-scoped trust statements for unit invocation.
// Purpose: Make each cross-service trust edge addressable and checkable.
// Dependencies: crate::core::{environment, error, hashing, identifiers, wildcard}, serde
// ============================================================================

//! ## Overview
//! A grant allows one principal to perform one action on one compute unit
//! for requests whose source ARN matches the grant's scope. The scope encodes
//! region, account, gateway id, stage, method and route; a grant scoped to
//! one stage never covers another stage with the same route.
//!
//! Grant completeness is not checked at composition time. A missing grant
//! shows up only when the simulator evaluates an invocation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::environment::DEFAULT_PARTITION;
use crate::core::environment::DeploymentEnvironment;
use crate::core::error::TopologyError;
use crate::core::hashing::hash_parts;
use crate::core::identifiers::GrantId;
use crate::core::identifiers::UnitId;
use crate::core::wildcard::wildcard_match;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Principal of the gateway service.
pub const GATEWAY_SERVICE_PRINCIPAL: &str = "apigateway.amazonaws.com";
/// Action required to invoke a compute unit.
pub const INVOKE_ACTION: &str = "lambda:InvokeFunction";
/// Pseudo-stage used by console test invocations.
pub const TEST_INVOKE_STAGE: &str = "test-invoke-stage";
/// Service segment of gateway execution ARNs.
const EXECUTE_API_SERVICE: &str = "execute-api";

// ============================================================================
// SECTION: Scope ARN
// ============================================================================

/// Execution ARN pattern scoping a grant.
///
/// Rendered as `arn:aws:execute-api:{region}:{account}:{api_id}/{stage}/{method}/{resource}`.
/// Any component may be `*` and the resource may contain `*` wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeArn {
    /// Region component.
    pub region: String,
    /// Account component.
    pub account: String,
    /// Gateway API id or `*`.
    pub api_id: String,
    /// Stage name or `*`.
    pub stage: String,
    /// Method token or `*`.
    pub method: String,
    /// Route resource path without the leading slash.
    pub resource: String,
}

impl ScopeArn {
    /// Builds a scope for one gateway in `environment`.
    #[must_use]
    pub fn new(
        environment: &DeploymentEnvironment,
        api_id: &str,
        stage: &str,
        method: &str,
        resource: &str,
    ) -> Self {
        Self {
            region: environment.region.clone(),
            account: environment.account.clone(),
            api_id: api_id.to_string(),
            stage: stage.to_string(),
            method: method.to_string(),
            resource: resource.trim_start_matches('/').to_string(),
        }
    }

    /// Returns true when the stage component is an exact stage name.
    #[must_use]
    pub fn has_literal_stage(&self) -> bool {
        !self.stage.contains(['*', '?'])
    }

    /// Returns true when this pattern covers the concrete `source` ARN.
    #[must_use]
    pub fn covers(&self, source: &Self) -> bool {
        wildcard_match(&self.to_string(), &source.to_string())
    }
}

impl fmt::Display for ScopeArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{DEFAULT_PARTITION}:{EXECUTE_API_SERVICE}:{}:{}:{}/{}/{}/{}",
            self.region, self.account, self.api_id, self.stage, self.method, self.resource
        )
    }
}

impl FromStr for ScopeArn {
    type Err = TopologyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || TopologyError::Configuration(format!("invalid execution arn {value:?}"));
        let prefix = format!("arn:{DEFAULT_PARTITION}:{EXECUTE_API_SERVICE}:");
        let rest = value.strip_prefix(&prefix).ok_or_else(invalid)?;
        let mut head = rest.splitn(3, ':');
        let region = head.next().filter(|part| !part.is_empty()).ok_or_else(invalid)?;
        let account = head.next().filter(|part| !part.is_empty()).ok_or_else(invalid)?;
        let path = head.next().ok_or_else(invalid)?;
        let mut parts = path.splitn(4, '/');
        let api_id = parts.next().filter(|part| !part.is_empty()).ok_or_else(invalid)?;
        let stage = parts.next().filter(|part| !part.is_empty()).ok_or_else(invalid)?;
        let method = parts.next().filter(|part| !part.is_empty()).ok_or_else(invalid)?;
        let resource = parts.next().unwrap_or_default();
        Ok(Self {
            region: region.to_string(),
            account: account.to_string(),
            api_id: api_id.to_string(),
            stage: stage.to_string(),
            method: method.to_string(),
            resource: resource.to_string(),
        })
    }
}

impl TryFrom<String> for ScopeArn {
    type Error = TopologyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScopeArn> for String {
    fn from(value: ScopeArn) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Grants
// ============================================================================

/// How a grant entered the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantOrigin {
    /// Generated when a route was wired into the primary stage.
    Default,
    /// Declared explicitly, typically for an additional stage.
    Explicit,
}

/// Explicit trust edge allowing a principal to invoke a compute unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationGrant {
    /// Grant handle, derived from its `(principal, action, scope)` triple.
    pub id: GrantId,
    /// Permitted action.
    pub action: String,
    /// Source principal.
    pub principal: String,
    /// Target compute unit.
    pub target: UnitId,
    /// Source ARN pattern.
    pub scope: ScopeArn,
    /// Grant origin.
    pub origin: GrantOrigin,
}

impl InvocationGrant {
    /// Creates a grant.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the principal is empty or
    /// the action is not `service:Action` shaped.
    pub fn new(
        principal: impl Into<String>,
        action: impl Into<String>,
        target: UnitId,
        scope: ScopeArn,
        origin: GrantOrigin,
    ) -> Result<Self, TopologyError> {
        let principal = principal.into();
        let action = action.into();
        if principal.trim().is_empty() {
            return Err(TopologyError::Configuration("grant principal must be non-empty".into()));
        }
        if !action.split_once(':').is_some_and(|(service, verb)| !service.is_empty() && !verb.is_empty())
        {
            return Err(TopologyError::Configuration(format!(
                "grant action {action:?} must be in service:Action form"
            )));
        }
        let scope_text = scope.to_string();
        let token = hash_parts(&[target.as_str(), &principal, &action, &scope_text]).token(12);
        Ok(Self {
            id: GrantId::new(format!("grant/{}/{token}", target.as_str().trim_start_matches("unit/"))),
            action,
            principal,
            target,
            scope,
            origin,
        })
    }

    /// Returns true when this grant authorizes `principal` to perform
    /// `action` on `target` for a request with the given source ARN.
    #[must_use]
    pub fn authorizes(&self, principal: &str, action: &str, target: &UnitId, source: &ScopeArn) -> bool {
        self.principal == principal
            && &self.target == target
            && wildcard_match(&self.action, action)
            && self.scope.covers(source)
    }
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

    fn environment() -> Result<DeploymentEnvironment, TopologyError> {
        DeploymentEnvironment::new("123456789012", "ap-northeast-1")
    }

    #[test]
    fn scope_renders_and_parses() -> Result<(), TopologyError> {
        let scope = ScopeArn::new(&environment()?, "abc123", "prod", "GET", "/{proxy+}");
        let rendered = scope.to_string();
        assert_eq!(rendered, "arn:aws:execute-api:ap-northeast-1:123456789012:abc123/prod/GET/{proxy+}");
        assert_eq!(rendered.parse::<ScopeArn>()?, scope);
        Ok(())
    }

    #[test]
    fn stage_scoped_grant_does_not_cover_other_stage() -> Result<(), TopologyError> {
        let env = environment()?;
        let unit = UnitId::for_name("fn");
        let grant = InvocationGrant::new(
            GATEWAY_SERVICE_PRINCIPAL,
            INVOKE_ACTION,
            unit.clone(),
            ScopeArn::new(&env, "abc123", "dev", "*", "{proxy+}"),
            GrantOrigin::Default,
        )?;
        let dev = ScopeArn::new(&env, "abc123", "dev", "GET", "{proxy+}");
        let prod = ScopeArn::new(&env, "abc123", "prod", "GET", "{proxy+}");
        assert!(grant.authorizes(GATEWAY_SERVICE_PRINCIPAL, INVOKE_ACTION, &unit, &dev));
        assert!(!grant.authorizes(GATEWAY_SERVICE_PRINCIPAL, INVOKE_ACTION, &unit, &prod));
        Ok(())
    }

    #[test]
    fn malformed_arns_are_rejected() {
        assert!("arn:aws:s3:::bucket".parse::<ScopeArn>().is_err());
        assert!("arn:aws:execute-api:r:a:id".parse::<ScopeArn>().is_err());
    }
}
