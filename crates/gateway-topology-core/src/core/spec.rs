// crates/gateway-topology-core/src/core/spec.rs
// ============================================================================
// Module: Topology Specification
// Description: Declarative description of one composition pass.
// Purpose: Carry every composition choice as data with reference defaults.
// Dependencies: crate::core::{access, compute, deployment, error, gateway, identity, package, routing}, serde
// ============================================================================

//! ## Overview
//! A [`TopologySpec`] is everything the root composition needs apart from the
//! account/region context. Every field defaults to the reference topology: a
//! Python function behind a regional gateway with a key-gated greedy route,
//! public documentation routes, a verbose `dev` primary stage, a promoted
//! `prod` stage with its own grant, one key and one unlimited plan.
//!
//! Structural checks live here; cross-resource checks (unknown keys, stage
//! bindings, route collisions) happen during composition so they surface
//! with the same error kinds as the builder API.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::access::UsageLimits;
use crate::core::compute::EntryPoint;
use crate::core::deployment::LoggingPosture;
use crate::core::error::TopologyError;
use crate::core::gateway::ApiKeySource;
use crate::core::gateway::CorsPolicy;
use crate::core::gateway::EndpointVisibility;
use crate::core::identity::COMPUTE_SERVICE_PRINCIPAL;
use crate::core::identity::DEFAULT_POLICY_NAME;
use crate::core::identity::PermissionStatement;
use crate::core::package::BundleLocation;
use crate::core::package::RuntimeVersion;
use crate::core::routing::HttpMethod;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default nested deployment unit name.
pub const DEFAULT_NESTED_UNIT_NAME: &str = "FastapiStack";
/// Documentation routes governed by `public_docs_routes`.
pub const DOCS_ROUTES: [&str; 2] = ["/docs", "/openapi.json"];
/// Maximum number of additional stages.
const MAX_ADDITIONAL_STAGES: usize = 32;
/// Maximum number of declared routes.
const MAX_ROUTES: usize = 256;

// ============================================================================
// SECTION: Isolation
// ============================================================================

/// How the topology is placed in deployment units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationMode {
    /// Every resource lives in the root unit.
    Flat,
    /// Resources live in a nested unit; only the output lives in the root.
    #[default]
    Nested,
}

impl IsolationMode {
    /// Returns the stable label for the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Nested => "nested",
        }
    }
}

// ============================================================================
// SECTION: Component Specs
// ============================================================================

/// Execution identity declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySpec {
    /// Role name.
    #[serde(default = "default_identity_name")]
    pub name: String,
    /// Principal allowed to assume the role.
    #[serde(default = "default_trusted_principal")]
    pub trusted_principal: String,
    /// Role description.
    #[serde(default = "default_identity_description")]
    pub description: Option<String>,
    /// Inline policy name.
    #[serde(default = "default_policy_name")]
    pub policy_name: String,
    /// Inline permission statements.
    #[serde(default = "default_statements")]
    pub statements: Vec<PermissionStatement>,
}

impl Default for IdentitySpec {
    fn default() -> Self {
        Self {
            name: default_identity_name(),
            trusted_principal: default_trusted_principal(),
            description: default_identity_description(),
            policy_name: default_policy_name(),
            statements: default_statements(),
        }
    }
}

/// Runtime package declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Layer version name.
    pub name: String,
    /// Bundle location relative to the asset root.
    pub bundle: BundleLocation,
    /// Compatible runtimes.
    pub compatible_runtimes: Vec<RuntimeVersion>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Compute unit declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Function name.
    #[serde(default = "default_function_name")]
    pub name: String,
    /// Runtime version.
    #[serde(default = "default_runtime")]
    pub runtime: RuntimeVersion,
    /// Handler reference.
    #[serde(default = "default_entry_point")]
    pub entry_point: EntryPoint,
    /// Source bundle.
    #[serde(default = "default_function_bundle")]
    pub bundle: BundleLocation,
    /// Names of packages to attach, in order.
    #[serde(default = "default_attached_packages")]
    pub packages: Vec<String>,
}

impl Default for FunctionSpec {
    fn default() -> Self {
        Self {
            name: default_function_name(),
            runtime: default_runtime(),
            entry_point: default_entry_point(),
            bundle: default_function_bundle(),
            packages: default_attached_packages(),
        }
    }
}

/// Route declaration targeting the function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Path pattern.
    pub path: String,
    /// Accepted method.
    pub method: HttpMethod,
    /// Whether callers must present a key.
    #[serde(default = "default_true")]
    pub api_key_required: bool,
}

/// Gateway declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySpec {
    /// Gateway name.
    #[serde(default = "default_gateway_name")]
    pub name: String,
    /// Endpoint exposure.
    #[serde(default)]
    pub endpoint: EndpointVisibility,
    /// Key source; `None` disables key reading.
    #[serde(default = "default_key_source")]
    pub api_key_source: Option<ApiKeySource>,
    /// CORS preflight policy; `None` disables preflight handling.
    #[serde(default = "default_cors")]
    pub cors: Option<CorsPolicy>,
    /// Application routes, in declaration order.
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteSpec>,
}

impl Default for GatewaySpec {
    fn default() -> Self {
        Self {
            name: default_gateway_name(),
            endpoint: EndpointVisibility::default(),
            api_key_source: default_key_source(),
            cors: default_cors(),
            routes: default_routes(),
        }
    }
}

/// Primary stage declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryStageSpec {
    /// Stage name.
    #[serde(default = "default_primary_stage_name")]
    pub name: String,
    /// Logging posture.
    #[serde(default = "LoggingPosture::verbose")]
    pub logging: LoggingPosture,
}

impl Default for PrimaryStageSpec {
    fn default() -> Self {
        Self {
            name: default_primary_stage_name(),
            logging: LoggingPosture::verbose(),
        }
    }
}

/// Grant declared for an additional stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageGrantSpec {
    /// Method token; `ANY` renders as `*`.
    pub method: HttpMethod,
    /// Route pattern the grant covers.
    pub route: String,
}

/// Additional stage declaration with its own deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Stage name.
    pub name: String,
    /// Logging posture.
    #[serde(default = "LoggingPosture::info")]
    pub logging: LoggingPosture,
    /// Explicit invocation grants for this stage.
    #[serde(default)]
    pub grants: Vec<StageGrantSpec>,
}

/// API key declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeySpec {
    /// Key name.
    pub name: String,
    /// Key value; derived deterministically when absent.
    #[serde(default)]
    pub value: Option<String>,
    /// Whether the key is accepted.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Access plan declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPlanSpec {
    /// Plan name.
    pub name: String,
    /// Usage policy; defaults to explicit unlimited.
    #[serde(default)]
    pub limits: UsageLimits,
    /// Key names bound to the plan.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Stage names bound to the plan.
    #[serde(default)]
    pub stages: Vec<String>,
}

// ============================================================================
// SECTION: Topology Spec
// ============================================================================

/// Full composition declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySpec {
    /// Deployment unit placement.
    #[serde(default)]
    pub isolation: IsolationMode,
    /// Nested unit name when `isolation = "nested"`.
    #[serde(default = "default_nested_unit_name")]
    pub nested_unit_name: String,
    /// Whether `/docs` and `/openapi.json` skip key enforcement.
    #[serde(default = "default_true")]
    pub public_docs_routes: bool,
    /// Execution identity.
    #[serde(default)]
    pub identity: IdentitySpec,
    /// Runtime packages.
    #[serde(default = "default_packages")]
    pub packages: Vec<PackageSpec>,
    /// Compute unit.
    #[serde(default)]
    pub function: FunctionSpec,
    /// Gateway and application routes.
    #[serde(default)]
    pub gateway: GatewaySpec,
    /// Primary stage.
    #[serde(default)]
    pub primary_stage: PrimaryStageSpec,
    /// Additional stages, each with its own deployment.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageSpec>,
    /// Consumer keys.
    #[serde(default = "default_api_keys")]
    pub api_keys: Vec<ApiKeySpec>,
    /// Access plans.
    #[serde(default = "default_access_plans")]
    pub access_plans: Vec<AccessPlanSpec>,
}

impl Default for TopologySpec {
    fn default() -> Self {
        Self {
            isolation: IsolationMode::default(),
            nested_unit_name: default_nested_unit_name(),
            public_docs_routes: true,
            identity: IdentitySpec::default(),
            packages: default_packages(),
            function: FunctionSpec::default(),
            gateway: GatewaySpec::default(),
            primary_stage: PrimaryStageSpec::default(),
            stages: default_stages(),
            api_keys: default_api_keys(),
            access_plans: default_access_plans(),
        }
    }
}

impl TopologySpec {
    /// Validates structural constraints.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when names are empty,
    /// duplicated, or collections exceed their limits.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.isolation == IsolationMode::Nested {
            ensure_non_empty("nested_unit_name", &self.nested_unit_name)?;
        }
        ensure_non_empty("function.name", &self.function.name)?;
        ensure_non_empty("gateway.name", &self.gateway.name)?;
        ensure_non_empty("primary_stage.name", &self.primary_stage.name)?;
        if self.gateway.routes.len() > MAX_ROUTES {
            return Err(TopologyError::Configuration(format!(
                "gateway.routes exceeds {MAX_ROUTES} entries"
            )));
        }
        if self.stages.len() > MAX_ADDITIONAL_STAGES {
            return Err(TopologyError::Configuration(format!(
                "stages exceeds {MAX_ADDITIONAL_STAGES} entries"
            )));
        }
        let mut stage_names = vec![self.primary_stage.name.as_str()];
        for stage in &self.stages {
            ensure_unique("stage", &mut stage_names, &stage.name)?;
        }
        let mut package_names = Vec::new();
        for package in &self.packages {
            ensure_unique("package", &mut package_names, &package.name)?;
        }
        let mut key_names = Vec::new();
        for key in &self.api_keys {
            ensure_unique("api key", &mut key_names, &key.name)?;
        }
        let mut plan_names = Vec::new();
        for plan in &self.access_plans {
            ensure_unique("access plan", &mut plan_names, &plan.name)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Ensures a named field is non-empty.
fn ensure_non_empty(field: &str, value: &str) -> Result<(), TopologyError> {
    if value.trim().is_empty() {
        return Err(TopologyError::Configuration(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Ensures `name` is non-empty and not yet in `seen`, then records it.
fn ensure_unique<'a>(
    label: &str,
    seen: &mut Vec<&'a str>,
    name: &'a str,
) -> Result<(), TopologyError> {
    ensure_non_empty(label, name)?;
    if seen.contains(&name) {
        return Err(TopologyError::Configuration(format!("duplicate {label} name: {name}")));
    }
    seen.push(name);
    Ok(())
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Shared `true` default.
const fn default_true() -> bool {
    true
}

/// Default nested unit name.
fn default_nested_unit_name() -> String {
    DEFAULT_NESTED_UNIT_NAME.to_string()
}

/// Default role name.
fn default_identity_name() -> String {
    "fastapi-sample-lambda-role".to_string()
}

/// Default trusted principal (the compute runtime).
fn default_trusted_principal() -> String {
    COMPUTE_SERVICE_PRINCIPAL.to_string()
}

/// Default role description.
#[allow(clippy::unnecessary_wraps, reason = "Serde default for an optional field.")]
fn default_identity_description() -> Option<String> {
    Some("Execution role for the sample function with log-write access".to_string())
}

/// Default inline policy name.
fn default_policy_name() -> String {
    DEFAULT_POLICY_NAME.to_string()
}

/// Default statements: log-write on all resources.
fn default_statements() -> Vec<PermissionStatement> {
    vec![PermissionStatement::log_write()]
}

/// Default runtime package list.
fn default_packages() -> Vec<PackageSpec> {
    vec![PackageSpec {
        name: "fastapi_sample_layer".to_string(),
        bundle: BundleLocation::new("lambda_layer"),
        compatible_runtimes: vec![default_runtime()],
        description: Some("Web framework and adapter libraries for the function".to_string()),
    }]
}

/// Default function name.
fn default_function_name() -> String {
    "fastapi_sample".to_string()
}

/// Default runtime version.
fn default_runtime() -> RuntimeVersion {
    RuntimeVersion::new("python3.11")
}

/// Default handler reference.
fn default_entry_point() -> EntryPoint {
    EntryPoint {
        module: "app".to_string(),
        function: "handler".to_string(),
    }
}

/// Default function source bundle.
fn default_function_bundle() -> BundleLocation {
    BundleLocation::new("src")
}

/// Default attached package names.
fn default_attached_packages() -> Vec<String> {
    vec!["fastapi_sample_layer".to_string()]
}

/// Default gateway name.
fn default_gateway_name() -> String {
    "fastapi-sample-apigw".to_string()
}

/// Default key source.
#[allow(clippy::unnecessary_wraps, reason = "Serde default for an optional field.")]
const fn default_key_source() -> Option<ApiKeySource> {
    Some(ApiKeySource::Header)
}

/// Default CORS policy.
#[allow(clippy::unnecessary_wraps, reason = "Serde default for an optional field.")]
fn default_cors() -> Option<CorsPolicy> {
    Some(CorsPolicy::default())
}

/// Default application routes.
fn default_routes() -> Vec<RouteSpec> {
    vec![RouteSpec {
        path: "/{proxy+}".to_string(),
        method: HttpMethod::Get,
        api_key_required: true,
    }]
}

/// Default primary stage name.
fn default_primary_stage_name() -> String {
    "dev".to_string()
}

/// Default additional stages.
fn default_stages() -> Vec<StageSpec> {
    vec![StageSpec {
        name: "prod".to_string(),
        logging: LoggingPosture::info(),
        grants: vec![StageGrantSpec {
            method: HttpMethod::Get,
            route: "/{proxy+}".to_string(),
        }],
    }]
}

/// Default consumer keys.
fn default_api_keys() -> Vec<ApiKeySpec> {
    vec![ApiKeySpec {
        name: "fastapi-sample-apikey".to_string(),
        value: None,
        enabled: true,
    }]
}

/// Default access plans.
fn default_access_plans() -> Vec<AccessPlanSpec> {
    vec![AccessPlanSpec {
        name: "fastapi-sample-usageplan".to_string(),
        limits: UsageLimits::Unlimited,
        keys: vec!["fastapi-sample-apikey".to_string()],
        stages: vec!["dev".to_string(), "prod".to_string()],
    }]
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
    fn defaults_validate() {
        assert!(TopologySpec::default().validate().is_ok());
    }

    #[test]
    fn duplicate_stage_names_are_rejected() {
        let mut spec = TopologySpec::default();
        spec.stages.push(StageSpec {
            name: "dev".to_string(),
            logging: LoggingPosture::default(),
            grants: Vec::new(),
        });
        assert!(matches!(spec.validate(), Err(TopologyError::Configuration(_))));
    }

    #[test]
    fn empty_json_object_yields_reference_topology() -> Result<(), serde_json::Error> {
        let spec: TopologySpec = serde_json::from_str("{}")?;
        assert_eq!(spec, TopologySpec::default());
        Ok(())
    }
}
