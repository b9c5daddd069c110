// crates/gateway-topology-core/src/core/identity.rs
// ============================================================================
// Module: Identity Descriptor
// Description: Execution role assumed by the compute runtime.
// Purpose: Validate trust and minimum permissions of the compute identity.
// Dependencies: crate::core::{error, identifiers, review, wildcard}, serde
// ============================================================================

//! ## Overview
//! An identity descriptor names the principal allowed to assume the role and
//! the inline permission statements granted to it. Statements are forwarded
//! exactly as declared. Broad scopes are reported through
//! [`IdentityDescriptor::review`] rather than narrowed, because the
//! organizational policy that decides what is "too broad" lives on the
//! platform side.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::TopologyError;
use crate::core::identifiers::IdentityId;
use crate::core::review::FindingKind;
use crate::core::review::ReviewFinding;
use crate::core::wildcard::wildcard_match;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Service principal of the compute runtime.
pub const COMPUTE_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
/// Actions the compute identity must be able to perform to emit logs.
pub const LOG_WRITE_ACTIONS: [&str; 2] = ["logs:CreateLogStream", "logs:PutLogEvents"];
/// Default inline policy name for the log-write statements.
pub const DEFAULT_POLICY_NAME: &str = "loggingRole";

// ============================================================================
// SECTION: Permission Statements
// ============================================================================

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementEffect {
    /// Grants the listed actions.
    #[default]
    Allow,
    /// Denies the listed actions.
    Deny,
}

/// A single inline permission statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStatement {
    /// Statement effect.
    #[serde(default)]
    pub effect: StatementEffect,
    /// Action patterns, e.g. `logs:PutLogEvents` or `logs:*`.
    pub actions: Vec<String>,
    /// Resource scopes, forwarded unmodified.
    pub resources: Vec<String>,
}

impl PermissionStatement {
    /// Creates an allow statement.
    #[must_use]
    pub fn allow(actions: &[&str], resources: &[&str]) -> Self {
        Self {
            effect: StatementEffect::Allow,
            actions: actions.iter().map(ToString::to_string).collect(),
            resources: resources.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns the log-write statement used by the reference topology.
    #[must_use]
    pub fn log_write() -> Self {
        Self::allow(
            &["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
            &["*"],
        )
    }

    /// Returns true when this statement matches `action`.
    #[must_use]
    pub fn covers(&self, action: &str) -> bool {
        self.actions.iter().any(|pattern| wildcard_match(pattern, action))
    }
}

// ============================================================================
// SECTION: Identity Descriptor
// ============================================================================

/// Execution identity bound to a compute unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDescriptor {
    /// Identity handle.
    pub id: IdentityId,
    /// Role name.
    pub name: String,
    /// Principal allowed to assume the role.
    pub trusted_principal: String,
    /// Optional role description.
    pub description: Option<String>,
    /// Inline policy name grouping the statements.
    pub policy_name: String,
    /// Inline permission statements.
    pub statements: Vec<PermissionStatement>,
}

impl IdentityDescriptor {
    /// Creates a validated identity descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the name or principal is
    /// empty, no statements are declared, a statement is malformed, or the
    /// statements do not allow the log-write actions.
    pub fn create(
        name: impl Into<String>,
        trusted_principal: impl Into<String>,
        statements: Vec<PermissionStatement>,
    ) -> Result<Self, TopologyError> {
        let name = name.into();
        let trusted_principal = trusted_principal.into();
        if name.trim().is_empty() {
            return Err(TopologyError::Configuration("identity name must be non-empty".into()));
        }
        if trusted_principal.trim().is_empty() {
            return Err(TopologyError::Configuration(format!(
                "identity {name} must declare a trusted principal"
            )));
        }
        if statements.is_empty() {
            return Err(TopologyError::Configuration(format!(
                "identity {name} must declare at least one permission statement"
            )));
        }
        for (index, statement) in statements.iter().enumerate() {
            if statement.actions.iter().all(|action| action.trim().is_empty()) {
                return Err(TopologyError::Configuration(format!(
                    "identity {name} statement {index} has no actions"
                )));
            }
            if statement.resources.iter().all(|resource| resource.trim().is_empty()) {
                return Err(TopologyError::Configuration(format!(
                    "identity {name} statement {index} has no resources"
                )));
            }
        }
        let descriptor = Self {
            id: IdentityId::for_name(&name),
            name,
            trusted_principal,
            description: None,
            policy_name: DEFAULT_POLICY_NAME.to_string(),
            statements,
        };
        for action in LOG_WRITE_ACTIONS {
            if !descriptor.allows(action) {
                return Err(TopologyError::Configuration(format!(
                    "identity {} must allow {action}",
                    descriptor.name
                )));
            }
        }
        Ok(descriptor)
    }

    /// Sets the role description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the inline policy name.
    #[must_use]
    pub fn with_policy_name(mut self, policy_name: impl Into<String>) -> Self {
        self.policy_name = policy_name.into();
        self
    }

    /// Returns true when an allow statement covers `action` and no deny does.
    #[must_use]
    pub fn allows(&self, action: &str) -> bool {
        let denied = self
            .statements
            .iter()
            .any(|statement| statement.effect == StatementEffect::Deny && statement.covers(action));
        !denied
            && self.statements.iter().any(|statement| {
                statement.effect == StatementEffect::Allow && statement.covers(action)
            })
    }

    /// Returns true when the identity can be assumed by the compute runtime.
    #[must_use]
    pub fn trusts_compute_runtime(&self) -> bool {
        self.trusted_principal == COMPUTE_SERVICE_PRINCIPAL
    }

    /// Reports wildcard scopes and actions for review.
    #[must_use]
    pub fn review(&self) -> Vec<ReviewFinding> {
        let mut findings = Vec::new();
        for (index, statement) in self.statements.iter().enumerate() {
            if statement.effect != StatementEffect::Allow {
                continue;
            }
            if statement.resources.iter().any(|resource| resource.trim() == "*") {
                findings.push(ReviewFinding::new(
                    self.id.as_logical(),
                    FindingKind::WildcardResource,
                    format!(
                        "statement {index} of policy {} applies to all resources",
                        self.policy_name
                    ),
                ));
            }
            if let Some(action) = statement
                .actions
                .iter()
                .find(|action| action.trim() == "*" || action.trim().ends_with(":*"))
            {
                findings.push(ReviewFinding::new(
                    self.id.as_logical(),
                    FindingKind::WildcardAction,
                    format!("statement {index} of policy {} grants {action}", self.policy_name),
                ));
            }
        }
        findings
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
