// crates/gateway-topology-core/src/core/access.rs
// ============================================================================
// Module: Access Plans
// Description: Consumer API keys, usage limits, and plan bindings.
// Purpose: Gate key-required routes behind plans bound to existing stages.
// Dependencies: crate::core::{deployment, error, identifiers}, serde
// ============================================================================

//! ## Overview
//! An access plan ties consumer keys to a usage policy and to the stages
//! where the policy applies. A key admits a request only on a stage bound to
//! a plan that also holds the key. Unlimited usage is a value of its own,
//! never an absent field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::deployment::Stage;
use crate::core::error::TopologyError;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::PlanId;
use crate::core::identifiers::StageId;

// ============================================================================
// SECTION: Keys
// ============================================================================

/// Minimum length accepted for a supplied key value.
pub const MIN_KEY_VALUE_LENGTH: usize = 20;

/// Consumer API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Key handle.
    pub id: KeyId,
    /// Key name.
    pub name: String,
    /// Secret value presented by callers.
    pub value: String,
    /// Whether the key is accepted.
    pub enabled: bool,
}

impl ApiKey {
    /// Creates an enabled key.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] for an empty name or a value
    /// that is too short or not alphanumeric.
    pub fn create(name: impl Into<String>, value: impl Into<String>) -> Result<Self, TopologyError> {
        let name = name.into();
        let value = value.into();
        if name.trim().is_empty() {
            return Err(TopologyError::Configuration("api key name must be non-empty".into()));
        }
        if value.len() < MIN_KEY_VALUE_LENGTH || !value.chars().all(|ch| ch.is_ascii_alphanumeric())
        {
            return Err(TopologyError::Configuration(format!(
                "api key {name} value must be at least {MIN_KEY_VALUE_LENGTH} alphanumeric characters"
            )));
        }
        Ok(Self {
            id: KeyId::for_name(&name),
            name,
            value,
            enabled: true,
        })
    }

    /// Disables the key.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ============================================================================
// SECTION: Usage Limits
// ============================================================================

/// Request rate throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throttle {
    /// Steady-state requests per second.
    pub rate_limit: u32,
    /// Burst capacity.
    pub burst_limit: u32,
}

/// Quota accounting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaPeriod {
    /// Calendar day.
    Day,
    /// Calendar week.
    Week,
    /// Calendar month.
    Month,
}

/// Request count quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    /// Maximum requests per period.
    pub limit: u64,
    /// Accounting window.
    pub period: QuotaPeriod,
}

/// Usage policy of an access plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UsageLimits {
    /// No throttle and no quota.
    #[default]
    Unlimited,
    /// At least one of throttle or quota.
    Limited {
        /// Optional throttle.
        #[serde(default)]
        throttle: Option<Throttle>,
        /// Optional quota.
        #[serde(default)]
        quota: Option<Quota>,
    },
}

impl UsageLimits {
    /// Validates the numeric policy.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when a limited policy sets
    /// neither throttle nor quota, or a value is zero.
    pub fn validate(&self) -> Result<(), TopologyError> {
        let Self::Limited {
            throttle,
            quota,
        } = self
        else {
            return Ok(());
        };
        if throttle.is_none() && quota.is_none() {
            return Err(TopologyError::Configuration(
                "limited usage must set a throttle or a quota; use unlimited otherwise".into(),
            ));
        }
        if let Some(throttle) = throttle
            && (throttle.rate_limit == 0 || throttle.burst_limit == 0)
        {
            return Err(TopologyError::Configuration("throttle limits must be positive".into()));
        }
        if let Some(quota) = quota
            && quota.limit == 0
        {
            return Err(TopologyError::Configuration("quota limit must be positive".into()));
        }
        Ok(())
    }

    /// Returns true for the unlimited policy.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Returns the quota, if any.
    #[must_use]
    pub const fn quota(&self) -> Option<&Quota> {
        match self {
            Self::Unlimited => None,
            Self::Limited {
                quota, ..
            } => quota.as_ref(),
        }
    }
}

// ============================================================================
// SECTION: Access Plan
// ============================================================================

/// Usage plan binding keys to stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPlan {
    /// Plan handle.
    pub id: PlanId,
    /// Plan name.
    pub name: String,
    /// Usage policy.
    pub limits: UsageLimits,
    /// Bound keys, in binding order.
    keys: Vec<KeyId>,
    /// Bound stages, in binding order.
    stages: Vec<StageId>,
}

impl AccessPlan {
    /// Creates a plan with no bindings.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] for an empty name or invalid limits.
    pub fn create(name: impl Into<String>, limits: UsageLimits) -> Result<Self, TopologyError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TopologyError::Configuration("access plan name must be non-empty".into()));
        }
        limits.validate()?;
        Ok(Self {
            id: PlanId::for_name(&name),
            name,
            limits,
            keys: Vec::new(),
            stages: Vec::new(),
        })
    }

    /// Binds a key to the plan.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the key is already bound.
    pub fn bind_key(&mut self, key: &ApiKey) -> Result<(), TopologyError> {
        if self.keys.contains(&key.id) {
            return Err(TopologyError::Configuration(format!(
                "key {} is already bound to plan {}",
                key.name, self.name
            )));
        }
        self.keys.push(key.id.clone());
        Ok(())
    }

    /// Binds a stage to the plan. The stage must already be bound to a deployment.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnboundStage`] when the stage has no
    /// deployment and [`TopologyError::Configuration`] when it is already bound
    /// to this plan.
    pub fn bind_stage(&mut self, stage: &Stage) -> Result<(), TopologyError> {
        if !stage.is_bound() {
            return Err(TopologyError::UnboundStage(stage.name.clone()));
        }
        if self.stages.contains(&stage.id) {
            return Err(TopologyError::Configuration(format!(
                "stage {} is already bound to plan {}",
                stage.name, self.name
            )));
        }
        self.stages.push(stage.id.clone());
        Ok(())
    }

    /// Returns bound keys in binding order.
    #[must_use]
    pub fn keys(&self) -> &[KeyId] {
        &self.keys
    }

    /// Returns bound stages in binding order.
    #[must_use]
    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    /// Returns true when `key` may call through `stage` under this plan.
    #[must_use]
    pub fn admits(&self, key: &KeyId, stage: &StageId) -> bool {
        self.keys.contains(key) && self.stages.contains(stage)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
