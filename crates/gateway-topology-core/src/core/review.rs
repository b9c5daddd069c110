// crates/gateway-topology-core/src/core/review.rs
// ============================================================================
// Module: Review Findings
// Description: Non-fatal observations surfaced for human review.
// Purpose: Flag risky-but-legal declarations without rewriting them.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! Some declarations are valid but deserve a second look: wildcard resource
//! scopes on the execution role, usage plans without limits, or routes that
//! opt out of key enforcement. The composition forwards the declaration
//! unmodified and records a finding instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::LogicalId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Classification of a review finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// A permission statement applies to every resource.
    WildcardResource,
    /// A permission statement grants every action of a service (or all services).
    WildcardAction,
    /// A usage plan declares no throttle or quota.
    UnlimitedUsagePlan,
    /// A route skips key enforcement on a key-gated gateway.
    KeyEnforcementSkipped,
    /// An API key is not bound to any usage plan.
    UnboundKey,
    /// A usage plan is not bound to any stage.
    PlanWithoutStages,
}

impl FindingKind {
    /// Returns the stable label for the finding kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WildcardResource => "wildcard_resource",
            Self::WildcardAction => "wildcard_action",
            Self::UnlimitedUsagePlan => "unlimited_usage_plan",
            Self::KeyEnforcementSkipped => "key_enforcement_skipped",
            Self::UnboundKey => "unbound_key",
            Self::PlanWithoutStages => "plan_without_stages",
        }
    }
}

/// A single review finding attached to a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFinding {
    /// Resource the finding refers to.
    pub subject: LogicalId,
    /// Finding classification.
    pub kind: FindingKind,
    /// Human-readable detail.
    pub message: String,
}

impl ReviewFinding {
    /// Creates a new finding.
    #[must_use]
    pub fn new(subject: LogicalId, kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            subject,
            kind,
            message: message.into(),
        }
    }
}
