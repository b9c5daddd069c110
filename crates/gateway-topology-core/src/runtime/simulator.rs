// crates/gateway-topology-core/src/runtime/simulator.rs
// ============================================================================
// Module: Invocation Simulator
// Description: Evaluates requests against a composed topology.
// Purpose: Observe routing, key enforcement, quotas, and grants without a cloud.
// Dependencies: crate::{core, runtime::topology}, serde
// ============================================================================

//! ## Overview
//! The simulator replays the gateway pipeline for one request in a fixed
//! order: stage lookup, CORS preflight, route resolution, key enforcement,
//! quota accounting, then the invocation grant check. Each step that rejects
//! the request yields a distinct [`InvocationOutcome`], so a missing grant on
//! an additional stage is observable as [`InvocationOutcome::PermissionDenied`]
//! rather than as a composition error.
//!
//! The source ARN names the matched route's resource template, as the
//! gateway does, so a grant scoped to `GET/{proxy+}` covers every path the
//! greedy route serves.
//!
//! Throttle limits are carried for the provisioning collaborator and are not
//! simulated; quotas are counted per `(plan, key)` for the simulator's
//! lifetime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::access::AccessPlan;
use crate::core::access::ApiKey;
use crate::core::error::TopologyError;
use crate::core::gateway::CorsPolicy;
use crate::core::grant::GATEWAY_SERVICE_PRINCIPAL;
use crate::core::grant::INVOKE_ACTION;
use crate::core::grant::ScopeArn;
use crate::core::identifiers::DeploymentId;
use crate::core::identifiers::GatewayId;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::PlanId;
use crate::core::identifiers::RouteId;
use crate::core::identifiers::StageId;
use crate::core::identifiers::UnitId;
use crate::core::routing::HttpMethod;
use crate::core::routing::PathCaptures;
use crate::core::routing::RequestPath;
use crate::runtime::topology::GatewayRecord;
use crate::runtime::topology::Topology;

// ============================================================================
// SECTION: Request and Outcome
// ============================================================================

/// A request presented to a gateway stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// Stage name.
    pub stage: String,
    /// Request method.
    pub method: HttpMethod,
    /// Request path, with or without a query string.
    pub path: String,
    /// Value of the API key header, if sent.
    pub api_key: Option<String>,
}

impl InvocationRequest {
    /// Creates a request without an API key.
    #[must_use]
    pub fn new(stage: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            method,
            path: path.into(),
            api_key: None,
        }
    }

    /// Attaches an API key header value.
    #[must_use]
    pub fn with_api_key(mut self, value: impl Into<String>) -> Self {
        self.api_key = Some(value.into());
        self
    }
}

/// Result of simulating one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InvocationOutcome {
    /// The target compute unit was invoked.
    Invoked {
        /// Invoked compute unit.
        unit: UnitId,
        /// Matched route.
        route: RouteId,
        /// Deployment serving the stage.
        deployment: DeploymentId,
        /// Captured path parameters.
        captures: PathCaptures,
        /// Source ARN presented to the grant check.
        source_arn: String,
    },
    /// The gateway answered a CORS preflight itself.
    CorsPreflight {
        /// Allowed origins.
        allow_origins: Vec<String>,
        /// Allowed methods.
        allow_methods: Vec<String>,
        /// Allowed headers.
        allow_headers: Vec<String>,
        /// Preflight status code.
        status_code: u16,
    },
    /// No bound stage has this name.
    StageNotFound {
        /// Requested stage.
        stage: String,
    },
    /// No route in the stage's deployment matches.
    NotFound {
        /// Request method.
        method: HttpMethod,
        /// Request path.
        path: String,
    },
    /// Key enforcement rejected the request.
    Forbidden {
        /// Rejection reason.
        reason: String,
    },
    /// The plan quota admitting the key is used up.
    QuotaExceeded {
        /// Exhausted plan.
        plan: PlanId,
        /// Calling key.
        key: KeyId,
    },
    /// No grant lets the gateway invoke the target for this source ARN.
    PermissionDenied {
        /// Target compute unit.
        unit: UnitId,
        /// Source ARN presented to the grant check.
        source_arn: String,
    },
}

impl InvocationOutcome {
    /// Returns the HTTP status the gateway would answer with.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Invoked { .. } => 200,
            Self::CorsPreflight {
                status_code, ..
            } => *status_code,
            Self::StageNotFound { .. } | Self::NotFound { .. } | Self::Forbidden { .. } => 403,
            Self::QuotaExceeded { .. } => 429,
            Self::PermissionDenied { .. } => 500,
        }
    }

    /// Returns true when the request reached the compute unit or was a preflight.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Invoked { .. } | Self::CorsPreflight { .. })
    }
}

impl From<&CorsPolicy> for InvocationOutcome {
    fn from(policy: &CorsPolicy) -> Self {
        Self::CorsPreflight {
            allow_origins: policy.allow_origins.clone(),
            allow_methods: policy.allow_methods.clone(),
            allow_headers: policy.allow_headers.clone(),
            status_code: policy.status_code,
        }
    }
}

// ============================================================================
// SECTION: Simulator
// ============================================================================

/// Request evaluator for one gateway of a composed topology.
#[derive(Debug)]
pub struct Simulator<'a> {
    /// Composed topology.
    topology: &'a Topology,
    /// Gateway under evaluation.
    gateway: &'a GatewayRecord,
    /// Requests counted per plan and key.
    usage: BTreeMap<(PlanId, KeyId), u64>,
}

impl<'a> Simulator<'a> {
    /// Creates a simulator for `gateway`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the topology has no such gateway.
    pub fn new(topology: &'a Topology, gateway: &GatewayId) -> Result<Self, TopologyError> {
        let record = topology.gateway(gateway).ok_or_else(|| {
            TopologyError::Configuration(format!("topology has no gateway {gateway}"))
        })?;
        Ok(Self {
            topology,
            gateway: record,
            usage: BTreeMap::new(),
        })
    }

    /// Creates a simulator for the first declared gateway.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the topology has no gateway.
    pub fn for_primary_gateway(topology: &'a Topology) -> Result<Self, TopologyError> {
        let record = topology
            .primary_gateway()
            .ok_or_else(|| TopologyError::Configuration("topology declares no gateway".into()))?;
        Self::new(topology, &record.gateway.id)
    }

    /// Returns the number of requests counted for a plan and key.
    #[must_use]
    pub fn usage(&self, plan: &PlanId, key: &KeyId) -> u64 {
        self.usage.get(&(plan.clone(), key.clone())).copied().unwrap_or(0)
    }

    /// Evaluates one request.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the request path is malformed.
    pub fn invoke(&mut self, request: &InvocationRequest) -> Result<InvocationOutcome, TopologyError> {
        let gateway = self.gateway;
        let Some(stage) = gateway.stage_named(&request.stage).filter(|stage| stage.is_bound()) else {
            return Ok(InvocationOutcome::StageNotFound {
                stage: request.stage.clone(),
            });
        };
        let Some(deployment) = stage.deployment().and_then(|id| gateway.deployment(id)) else {
            return Ok(InvocationOutcome::StageNotFound {
                stage: request.stage.clone(),
            });
        };
        let path = RequestPath::parse(&request.path)?;
        let routes = deployment.routes();

        if request.method == HttpMethod::Options
            && let Some(policy) = &gateway.gateway.cors
            && routes.has_resource(&path)
            && !routes.routes().iter().any(|route| {
                route.method == HttpMethod::Options && route.pattern.capture(&path).is_some()
            })
        {
            return Ok(InvocationOutcome::from(policy));
        }

        let Some(matched) = routes.resolve(request.method, &path) else {
            return Ok(InvocationOutcome::NotFound {
                method: request.method,
                path: path.as_str().to_string(),
            });
        };
        let route = matched.route;

        if route.api_key_required {
            let (key, plan) = match self.authorize_key(request, &stage.id) {
                Ok(admitted) => admitted,
                Err(outcome) => return Ok(outcome),
            };
            if let Some(outcome) = self.charge_quota(plan, key) {
                return Ok(outcome);
            }
        }

        let source = ScopeArn::new(
            self.topology.environment(),
            &gateway.gateway.api_id,
            &stage.name,
            request.method.as_str(),
            route.pattern.arn_resource(),
        );
        let authorized = self.topology.grants().iter().any(|grant| {
            grant.authorizes(GATEWAY_SERVICE_PRINCIPAL, INVOKE_ACTION, &route.target, &source)
        });
        if !authorized {
            return Ok(InvocationOutcome::PermissionDenied {
                unit: route.target.clone(),
                source_arn: source.to_string(),
            });
        }
        Ok(InvocationOutcome::Invoked {
            unit: route.target.clone(),
            route: route.id.clone(),
            deployment: deployment.id().clone(),
            captures: matched.captures,
            source_arn: source.to_string(),
        })
    }

    /// Finds the key sent with the request and the plan admitting it.
    fn authorize_key(
        &self,
        request: &InvocationRequest,
        stage: &StageId,
    ) -> Result<(&'a ApiKey, &'a AccessPlan), InvocationOutcome> {
        if self.gateway.gateway.api_key_source.is_none() {
            return Err(forbidden("gateway has no api key source"));
        }
        let Some(value) = request.api_key.as_deref() else {
            return Err(forbidden("missing api key"));
        };
        let topology = self.topology;
        let Some(key) = topology.keys().iter().find(|key| key.value == value) else {
            return Err(forbidden("unknown api key"));
        };
        if !key.enabled {
            return Err(forbidden("api key is disabled"));
        }
        topology
            .plans()
            .iter()
            .find(|plan| plan.admits(&key.id, stage))
            .map(|plan| (key, plan))
            .ok_or_else(|| forbidden("api key is not admitted to this stage by any access plan"))
    }

    /// Counts one request against the plan quota.
    fn charge_quota(&mut self, plan: &AccessPlan, key: &ApiKey) -> Option<InvocationOutcome> {
        let counter = self.usage.entry((plan.id.clone(), key.id.clone())).or_insert(0);
        if let Some(quota) = plan.limits.quota()
            && *counter >= quota.limit
        {
            return Some(InvocationOutcome::QuotaExceeded {
                plan: plan.id.clone(),
                key: key.id.clone(),
            });
        }
        *counter += 1;
        None
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a key enforcement rejection.
fn forbidden(reason: &str) -> InvocationOutcome {
    InvocationOutcome::Forbidden {
        reason: reason.to_string(),
    }
}
