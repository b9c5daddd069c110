// crates/gateway-topology-core/src/core/gateway.rs
// ============================================================================
// Module: HTTP Gateway
// Description: Routing facade, CORS policy, endpoint and key-source posture.
// Purpose: Hold the live route table that deployments snapshot.
// Dependencies: crate::core::{error, identifiers, routing}, serde
// ============================================================================

//! ## Overview
//! The gateway owns the live route table. Routes carry their own key
//! requirement: a gateway-wide key source only says *where* keys are read
//! from, never *whether* a route demands one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::TopologyError;
use crate::core::identifiers::GatewayId;
use crate::core::identifiers::RouteId;
use crate::core::identifiers::UnitId;
use crate::core::routing::HttpMethod;
use crate::core::routing::PathPattern;
use crate::core::routing::Route;
use crate::core::routing::RouteTable;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying API keys when the key source is `header`.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Headers allowed by the default CORS preflight policy.
pub const DEFAULT_CORS_HEADERS: [&str; 6] = [
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
    "X-Amz-User-Agent",
];
/// Methods allowed by the permissive CORS preflight policy.
pub const ALL_CORS_METHODS: [&str; 7] = ["OPTIONS", "GET", "PUT", "POST", "DELETE", "PATCH", "HEAD"];

// ============================================================================
// SECTION: Gateway Options
// ============================================================================

/// Network exposure of the gateway endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointVisibility {
    /// Regional endpoint.
    #[default]
    Regional,
    /// Edge-optimized endpoint.
    Edge,
    /// Private (VPC-only) endpoint.
    Private,
}

/// Where the gateway reads consumer API keys from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeySource {
    /// The `x-api-key` request header.
    #[default]
    Header,
    /// A custom authorizer's usage identifier.
    Authorizer,
}

/// CORS preflight policy answered on every declared resource path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsPolicy {
    /// Allowed origins; `*` for all.
    #[serde(default = "default_allow_origins")]
    pub allow_origins: Vec<String>,
    /// Allowed methods.
    #[serde(default = "default_allow_methods")]
    pub allow_methods: Vec<String>,
    /// Allowed request headers.
    #[serde(default = "default_allow_headers")]
    pub allow_headers: Vec<String>,
    /// Status code returned for preflight requests.
    #[serde(default = "default_preflight_status")]
    pub status_code: u16,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origins: default_allow_origins(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
            status_code: default_preflight_status(),
        }
    }
}

impl CorsPolicy {
    /// Validates the preflight policy.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when lists are empty or the
    /// status code is not a 2xx code.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.allow_origins.is_empty() || self.allow_methods.is_empty() {
            return Err(TopologyError::Configuration(
                "cors policy must allow at least one origin and one method".into(),
            ));
        }
        if !(200 ..= 299).contains(&self.status_code) {
            return Err(TopologyError::Configuration(format!(
                "cors preflight status code {} must be 2xx",
                self.status_code
            )));
        }
        Ok(())
    }
}

/// Default CORS origins (all).
fn default_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Default CORS methods (all).
fn default_allow_methods() -> Vec<String> {
    ALL_CORS_METHODS.iter().map(ToString::to_string).collect()
}

/// Default CORS headers.
fn default_allow_headers() -> Vec<String> {
    DEFAULT_CORS_HEADERS.iter().map(ToString::to_string).collect()
}

/// Default preflight status code.
const fn default_preflight_status() -> u16 {
    200
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// HTTP gateway exposing routes to compute units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpGateway {
    /// Gateway handle.
    pub id: GatewayId,
    /// Gateway name.
    pub name: String,
    /// Platform-assigned API identifier used in URLs and ARNs.
    pub api_id: String,
    /// Live route table.
    pub routes: RouteTable,
    /// Optional CORS preflight policy.
    pub cors: Option<CorsPolicy>,
    /// Endpoint exposure.
    pub endpoint: EndpointVisibility,
    /// Key source; `None` when the gateway does not read keys at all.
    pub api_key_source: Option<ApiKeySource>,
}

impl HttpGateway {
    /// Creates a gateway with an empty route table.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the name, API id, or
    /// CORS policy is invalid.
    pub fn create(
        name: impl Into<String>,
        api_id: impl Into<String>,
        cors: Option<CorsPolicy>,
        api_key_source: Option<ApiKeySource>,
    ) -> Result<Self, TopologyError> {
        let name = name.into();
        let api_id = api_id.into();
        if name.trim().is_empty() {
            return Err(TopologyError::Configuration("gateway name must be non-empty".into()));
        }
        if api_id.is_empty() || !api_id.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(TopologyError::Configuration(format!(
                "gateway {name} api id must be alphanumeric"
            )));
        }
        if let Some(policy) = &cors {
            policy.validate()?;
        }
        Ok(Self {
            id: GatewayId::for_name(&name),
            name,
            api_id,
            routes: RouteTable::new(),
            cors,
            endpoint: EndpointVisibility::default(),
            api_key_source,
        })
    }

    /// Sets the endpoint exposure.
    #[must_use]
    pub const fn with_endpoint(mut self, endpoint: EndpointVisibility) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Adds a route forwarding matches to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] for a malformed pattern and
    /// [`TopologyError::DuplicateRoute`] on a `(pattern, method)` collision.
    pub fn add_route(
        &mut self,
        pattern: &str,
        method: HttpMethod,
        target: UnitId,
        api_key_required: bool,
    ) -> Result<&Route, TopologyError> {
        let pattern = PathPattern::parse(pattern)?;
        let route = Route {
            id: RouteId::for_route(&self.id, method.as_str(), pattern.as_str()),
            gateway: self.id.clone(),
            pattern,
            method,
            target,
            api_key_required,
        };
        self.routes.insert(route)?;
        self.routes
            .routes()
            .last()
            .ok_or_else(|| TopologyError::Configuration("route table is empty after insert".into()))
    }
}
