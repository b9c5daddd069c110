// crates/gateway-topology-core/src/core/deployment.rs
// ============================================================================
// Module: Deployments and Stages
// Description: Write-once route snapshots and the stages that expose them.
// Purpose: Freeze gateway configuration per stage for staged rollout.
// Dependencies: crate::core::{error, gateway, hashing, identifiers, routing}, serde
// ============================================================================

//! ## Overview
//! A [`Deployment`] copies the gateway's route table at the moment it is
//! created and never changes afterwards. A [`Stage`] starts unbound and is
//! bound to exactly one deployment; the binding is permanent. Route changes
//! made on the gateway after a deployment therefore reach a stage only
//! through a new deployment bound to a new stage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::TopologyError;
use crate::core::gateway::HttpGateway;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::DeploymentId;
use crate::core::identifiers::GatewayId;
use crate::core::identifiers::StageId;
use crate::core::routing::RouteTable;

// ============================================================================
// SECTION: Deployment
// ============================================================================

/// Immutable snapshot of a gateway route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Deployment handle.
    id: DeploymentId,
    /// Gateway the snapshot was taken from.
    gateway: GatewayId,
    /// Frozen route table.
    routes: RouteTable,
    /// Canonical fingerprint of the frozen route table.
    fingerprint: HashDigest,
}

impl Deployment {
    /// Snapshots the current route table of `gateway`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the gateway has no
    /// routes or the snapshot cannot be fingerprinted.
    pub fn snapshot(gateway: &HttpGateway, ordinal: usize) -> Result<Self, TopologyError> {
        if gateway.routes.is_empty() {
            return Err(TopologyError::Configuration(format!(
                "gateway {} has no routes to deploy",
                gateway.name
            )));
        }
        let routes = gateway.routes.clone();
        let fingerprint = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &routes)
            .map_err(|err| TopologyError::Configuration(err.to_string()))?;
        Ok(Self {
            id: DeploymentId::for_ordinal(&gateway.id, ordinal),
            gateway: gateway.id.clone(),
            routes,
            fingerprint,
        })
    }

    /// Returns the deployment handle.
    #[must_use]
    pub const fn id(&self) -> &DeploymentId {
        &self.id
    }

    /// Returns the gateway the snapshot belongs to.
    #[must_use]
    pub const fn gateway(&self) -> &GatewayId {
        &self.gateway
    }

    /// Returns the frozen route table.
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Returns the snapshot fingerprint.
    #[must_use]
    pub const fn fingerprint(&self) -> &HashDigest {
        &self.fingerprint
    }
}

// ============================================================================
// SECTION: Logging Posture
// ============================================================================

/// Execution log level of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Execution logging disabled.
    #[default]
    Off,
    /// Errors only.
    Error,
    /// Informational and error entries.
    Info,
}

/// Logging, tracing and metrics posture of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LoggingPosture {
    /// Execution log level.
    #[serde(default)]
    pub level: LogLevel,
    /// Whether full request/response data is traced.
    #[serde(default)]
    pub data_trace: bool,
    /// Whether detailed metrics are enabled.
    #[serde(default)]
    pub metrics_enabled: bool,
}

impl LoggingPosture {
    /// Posture used by the reference primary stage: info logs, data trace, metrics.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Info,
            data_trace: true,
            metrics_enabled: true,
        }
    }

    /// Info-level execution logs without tracing or metrics.
    #[must_use]
    pub const fn info() -> Self {
        Self {
            level: LogLevel::Info,
            data_trace: false,
            metrics_enabled: false,
        }
    }
}

// ============================================================================
// SECTION: Stage
// ============================================================================

/// Role of a stage within its gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Stage created alongside the gateway; receives default grants and the URL output.
    Primary,
    /// Separately promoted stage; needs explicit grants.
    Additional,
}

/// Binding state of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StageState {
    /// Declared but not yet bound.
    Unbound,
    /// Bound to a deployment; terminal.
    Bound {
        /// Bound deployment.
        deployment: DeploymentId,
    },
}

/// Addressable stage of a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage handle.
    pub id: StageId,
    /// Stage name used in URLs and ARNs.
    pub name: String,
    /// Owning gateway.
    pub gateway: GatewayId,
    /// Stage role.
    pub role: StageRole,
    /// Logging posture.
    pub logging: LoggingPosture,
    /// Binding state.
    state: StageState,
}

impl Stage {
    /// Declares an unbound stage.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the stage name is not a
    /// valid URL path segment.
    pub fn declare(
        gateway: &GatewayId,
        name: impl Into<String>,
        role: StageRole,
        logging: LoggingPosture,
    ) -> Result<Self, TopologyError> {
        let name = name.into();
        if name.is_empty()
            || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
        {
            return Err(TopologyError::Configuration(format!(
                "stage name {name:?} must be alphanumeric, '-' or '_'"
            )));
        }
        Ok(Self {
            id: StageId::for_stage(gateway, &name),
            name,
            gateway: gateway.clone(),
            role,
            logging,
            state: StageState::Unbound,
        })
    }

    /// Binds the stage to a deployment. Allowed exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the stage is already
    /// bound or the deployment belongs to another gateway.
    pub fn bind(&mut self, deployment: &Deployment) -> Result<(), TopologyError> {
        if deployment.gateway() != &self.gateway {
            return Err(TopologyError::Configuration(format!(
                "stage {} cannot bind deployment {} of another gateway",
                self.name,
                deployment.id()
            )));
        }
        match &self.state {
            StageState::Unbound => {
                self.state = StageState::Bound {
                    deployment: deployment.id().clone(),
                };
                Ok(())
            }
            StageState::Bound {
                deployment: bound,
            } => Err(TopologyError::Configuration(format!(
                "stage {} is already bound to {bound}",
                self.name
            ))),
        }
    }

    /// Returns the binding state.
    #[must_use]
    pub const fn state(&self) -> &StageState {
        &self.state
    }

    /// Returns the bound deployment, if any.
    #[must_use]
    pub const fn deployment(&self) -> Option<&DeploymentId> {
        match &self.state {
            StageState::Unbound => None,
            StageState::Bound {
                deployment,
            } => Some(deployment),
        }
    }

    /// Returns true once the stage is bound.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        matches!(self.state, StageState::Bound { .. })
    }
}
