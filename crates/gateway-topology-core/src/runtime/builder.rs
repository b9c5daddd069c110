// crates/gateway-topology-core/src/runtime/builder.rs
// ============================================================================
// Module: Topology Builder
// Description: Sequential, append-only construction of the resource graph.
// Purpose: Enforce creation order and cross-resource rules while declaring.
// Dependencies: crate::{core, interfaces, runtime::topology}, serde, serde_json
// ============================================================================

//! ## Overview
//! Every builder operation validates its inputs against resources declared
//! so far, then appends exactly the graph nodes it owns. Dependencies always
//! point at existing nodes, so the graph is a DAG by construction and the
//! declaration order is a valid build order.
//!
//! Wiring a gateway into its primary stage generates default invocation
//! grants for that stage (and for console test invocations) only. Every
//! additional stage needs explicit grants; a missing one is not an error
//! here and only shows up when the simulator evaluates a request.
//!
//! Security posture: referenced resources must already exist; no operation
//! narrows or widens declared permission scopes. Broad scopes are reported as
//! review findings instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;

use crate::core::access::AccessPlan;
use crate::core::access::ApiKey;
use crate::core::access::UsageLimits;
use crate::core::compute::ComputeUnit;
use crate::core::compute::ComputeUnitParams;
use crate::core::deployment::Deployment;
use crate::core::deployment::LoggingPosture;
use crate::core::deployment::Stage;
use crate::core::deployment::StageRole;
use crate::core::environment::DeploymentEnvironment;
use crate::core::error::TopologyError;
use crate::core::gateway::ApiKeySource;
use crate::core::gateway::CorsPolicy;
use crate::core::gateway::EndpointVisibility;
use crate::core::gateway::HttpGateway;
use crate::core::grant::GATEWAY_SERVICE_PRINCIPAL;
use crate::core::grant::GrantOrigin;
use crate::core::grant::INVOKE_ACTION;
use crate::core::grant::InvocationGrant;
use crate::core::grant::ScopeArn;
use crate::core::grant::TEST_INVOKE_STAGE;
use crate::core::graph::ROOT_SCOPE;
use crate::core::graph::ResourceGraph;
use crate::core::graph::ResourceKind;
use crate::core::graph::ResourceNode;
use crate::core::hashing::hash_parts;
use crate::core::identifiers::DeploymentId;
use crate::core::identifiers::GatewayId;
use crate::core::identifiers::GrantId;
use crate::core::identifiers::IdentityId;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::LogicalId;
use crate::core::identifiers::PackageId;
use crate::core::identifiers::PlanId;
use crate::core::identifiers::RouteId;
use crate::core::identifiers::StageId;
use crate::core::identifiers::UnitId;
use crate::core::identity::IdentityDescriptor;
use crate::core::identity::PermissionStatement;
use crate::core::manifest::StackOutput;
use crate::core::manifest::TopologyManifest;
use crate::core::package::BundleLocation;
use crate::core::package::RuntimePackageReference;
use crate::core::package::RuntimeVersion;
use crate::core::review::FindingKind;
use crate::core::review::ReviewFinding;
use crate::core::routing::HttpMethod;
use crate::core::routing::PathPattern;
use crate::core::routing::Route;
use crate::core::spec::IsolationMode;
use crate::interfaces::AssetInventory;
use crate::interfaces::CompositionAuditSink;
use crate::interfaces::CompositionEvent;
use crate::interfaces::CompositionEventKind;
use crate::runtime::topology::GatewayRecord;
use crate::runtime::topology::Topology;
use crate::runtime::topology::URL_OUTPUT;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length of derived gateway API ids.
const API_ID_LENGTH: usize = 10;
/// Length of derived API key values.
const KEY_VALUE_LENGTH: usize = 30;

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Sequential topology builder.
pub struct TopologyBuilder<'a> {
    /// Account/region context.
    environment: DeploymentEnvironment,
    /// Entry point resolution seam.
    inventory: &'a dyn AssetInventory,
    /// Audit sink for composition events.
    audit: &'a dyn CompositionAuditSink,
    /// Append-only resource graph.
    graph: ResourceGraph,
    /// Scope assigned to newly declared nodes.
    scope: String,
    /// Identities by handle.
    identities: BTreeMap<IdentityId, IdentityDescriptor>,
    /// Packages by handle.
    packages: BTreeMap<PackageId, RuntimePackageReference>,
    /// Compute units by handle.
    units: BTreeMap<UnitId, ComputeUnit>,
    /// Gateways in declaration order.
    gateways: Vec<GatewayRecord>,
    /// Keys in declaration order.
    keys: Vec<ApiKey>,
    /// Plans in declaration order.
    plans: Vec<AccessPlan>,
    /// Grants in declaration order.
    grants: Vec<InvocationGrant>,
    /// Exposed outputs.
    outputs: Vec<StackOutput>,
    /// Review findings in discovery order.
    findings: Vec<ReviewFinding>,
}

impl<'a> TopologyBuilder<'a> {
    /// Creates a builder for one composition pass.
    #[must_use]
    pub fn new(
        environment: DeploymentEnvironment,
        inventory: &'a dyn AssetInventory,
        audit: &'a dyn CompositionAuditSink,
    ) -> Self {
        Self {
            environment,
            inventory,
            audit,
            graph: ResourceGraph::new(),
            scope: ROOT_SCOPE.to_string(),
            identities: BTreeMap::new(),
            packages: BTreeMap::new(),
            units: BTreeMap::new(),
            gateways: Vec::new(),
            keys: Vec::new(),
            plans: Vec::new(),
            grants: Vec::new(),
            outputs: Vec::new(),
            findings: Vec::new(),
        }
    }

    /// Returns the account/region context.
    #[must_use]
    pub const fn environment(&self) -> &DeploymentEnvironment {
        &self.environment
    }

    /// Returns the graph declared so far.
    #[must_use]
    pub const fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Returns the review findings recorded so far.
    #[must_use]
    pub fn findings(&self) -> &[ReviewFinding] {
        &self.findings
    }

    // ------------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------------

    /// Starts declaring resources inside a nested deployment unit.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when a nested scope is already
    /// open or the name is empty or reserved.
    pub fn enter_scope(&mut self, name: &str) -> Result<(), TopologyError> {
        if self.scope != ROOT_SCOPE {
            return Err(TopologyError::Configuration(format!(
                "nested unit {} is still open",
                self.scope
            )));
        }
        if name.trim().is_empty() || name == ROOT_SCOPE {
            return Err(TopologyError::Configuration(format!("invalid nested unit name {name:?}")));
        }
        self.scope = name.to_string();
        Ok(())
    }

    /// Closes the open nested scope, declaring the nested unit in the root.
    ///
    /// The nested unit depends on every resource declared inside it.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when no nested scope is open
    /// or the scope declared nothing.
    pub fn close_scope(&mut self) -> Result<LogicalId, TopologyError> {
        if self.scope == ROOT_SCOPE {
            return Err(TopologyError::Configuration("no nested unit is open".into()));
        }
        let scope = std::mem::replace(&mut self.scope, ROOT_SCOPE.to_string());
        let members: Vec<LogicalId> = self
            .graph
            .nodes()
            .iter()
            .filter(|node| node.scope == scope)
            .map(|node| node.id.clone())
            .collect();
        if members.is_empty() {
            return Err(TopologyError::Configuration(format!("nested unit {scope} is empty")));
        }
        let id = nested_unit_id(&scope);
        let properties = json!({ "name": scope, "resource_count": members.len() });
        self.declare(id.clone(), ResourceKind::NestedUnit, members, &properties)?;
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Identity and packages
    // ------------------------------------------------------------------------

    /// Creates and declares an identity descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the descriptor is invalid
    /// or already declared.
    pub fn create_identity(
        &mut self,
        name: &str,
        trusted_principal: &str,
        statements: Vec<PermissionStatement>,
    ) -> Result<IdentityId, TopologyError> {
        let descriptor = IdentityDescriptor::create(name, trusted_principal, statements)?;
        self.add_identity(descriptor)
    }

    /// Declares a prepared identity descriptor and records its review findings.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the identity is already declared.
    pub fn add_identity(&mut self, descriptor: IdentityDescriptor) -> Result<IdentityId, TopologyError> {
        let id = descriptor.id.clone();
        self.declare(id.as_logical(), ResourceKind::Identity, Vec::new(), &descriptor)?;
        for finding in descriptor.review() {
            self.record_finding(finding);
        }
        self.identities.insert(id.clone(), descriptor);
        Ok(id)
    }

    /// Declares a runtime package reference.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the reference is invalid
    /// or already declared.
    pub fn declare_package(
        &mut self,
        name: &str,
        bundle: BundleLocation,
        compatible_runtimes: Vec<RuntimeVersion>,
    ) -> Result<PackageId, TopologyError> {
        let package = RuntimePackageReference::declare(name, bundle, compatible_runtimes)?;
        self.add_package(package)
    }

    /// Declares a prepared runtime package reference.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the package is already declared.
    pub fn add_package(&mut self, package: RuntimePackageReference) -> Result<PackageId, TopologyError> {
        let id = package.id.clone();
        self.declare(id.as_logical(), ResourceKind::Package, Vec::new(), &package)?;
        self.packages.insert(id.clone(), package);
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Compute
    // ------------------------------------------------------------------------

    /// Creates a compute unit bound to `identity` with `packages` attached.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CyclicDependency`] when the identity or a
    /// package is not declared yet, [`TopologyError::VersionMismatch`] for an
    /// incompatible package, and [`TopologyError::Configuration`] for trust,
    /// entry point, or naming problems.
    pub fn create_unit(
        &mut self,
        params: ComputeUnitParams,
        identity: &IdentityId,
        packages: &[PackageId],
    ) -> Result<UnitId, TopologyError> {
        let subject = format!("compute unit {}", params.name);
        let descriptor = self
            .identities
            .get(identity)
            .ok_or_else(|| undeclared(&subject, identity.as_str()))?;
        let mut attached = Vec::with_capacity(packages.len());
        for package in packages {
            let reference =
                self.packages.get(package).ok_or_else(|| undeclared(&subject, package.as_str()))?;
            attached.push(reference);
        }
        let unit = ComputeUnit::create(params, descriptor, &attached, self.inventory)?;
        let mut depends_on = vec![unit.identity.as_logical()];
        depends_on.extend(unit.packages.iter().map(PackageId::as_logical));
        let id = unit.id.clone();
        self.declare(id.as_logical(), ResourceKind::ComputeUnit, depends_on, &unit)?;
        self.units.insert(id.clone(), unit);
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Gateway and routes
    // ------------------------------------------------------------------------

    /// Creates a gateway with an empty route table.
    ///
    /// The API id is derived from the account, region and gateway name.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the gateway is invalid or
    /// already declared.
    pub fn create_gateway(
        &mut self,
        name: &str,
        cors: Option<CorsPolicy>,
        api_key_source: Option<ApiKeySource>,
        endpoint: EndpointVisibility,
    ) -> Result<GatewayId, TopologyError> {
        let api_id = hash_parts(&[&self.environment.account, &self.environment.region, name])
            .token(API_ID_LENGTH);
        let gateway = HttpGateway::create(name, api_id, cors, api_key_source)?.with_endpoint(endpoint);
        let id = gateway.id.clone();
        let properties = json!({
            "name": gateway.name,
            "api_id": gateway.api_id,
            "cors": gateway.cors,
            "endpoint": gateway.endpoint,
            "api_key_source": gateway.api_key_source,
        });
        self.declare(id.as_logical(), ResourceKind::Gateway, Vec::new(), &properties)?;
        self.gateways.push(GatewayRecord::new(gateway));
        Ok(id)
    }

    /// Adds a route forwarding matches to `target`.
    ///
    /// A route that skips key enforcement on a gateway with a key source is
    /// kept as declared and reported as a review finding.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CyclicDependency`] when the gateway or unit is
    /// not declared, [`TopologyError::DuplicateRoute`] on a collision, and
    /// [`TopologyError::Configuration`] for a malformed pattern.
    pub fn add_route(
        &mut self,
        gateway: &GatewayId,
        pattern: &str,
        method: HttpMethod,
        target: &UnitId,
        api_key_required: bool,
    ) -> Result<RouteId, TopologyError> {
        let subject = format!("route {method} {pattern}");
        if !self.units.contains_key(target) {
            return Err(undeclared(&subject, target.as_str()));
        }
        let record = self.gateway_mut(gateway, &subject)?;
        let gateway_has_key_source = record.gateway.api_key_source.is_some();
        let route = record.gateway.add_route(pattern, method, target.clone(), api_key_required)?.clone();
        let depends_on = vec![gateway.as_logical(), target.as_logical()];
        self.declare(route.id.as_logical(), ResourceKind::Route, depends_on, &route)?;
        if !api_key_required && gateway_has_key_source {
            self.record_finding(ReviewFinding::new(
                route.id.as_logical(),
                FindingKind::KeyEnforcementSkipped,
                format!("{method} {} skips key enforcement on {}", route.pattern, gateway.name()),
            ));
        }
        Ok(route.id)
    }

    // ------------------------------------------------------------------------
    // Deployments and stages
    // ------------------------------------------------------------------------

    /// Snapshots the gateway's current route table.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CyclicDependency`] when the gateway is not
    /// declared and [`TopologyError::Configuration`] when it has no routes.
    pub fn deploy(&mut self, gateway: &GatewayId) -> Result<DeploymentId, TopologyError> {
        let record = self.gateway_mut(gateway, "deployment")?;
        let deployment = Deployment::snapshot(&record.gateway, record.deployments.len() + 1)?;
        let mut depends_on = vec![gateway.as_logical()];
        depends_on.extend(deployment.routes().routes().iter().map(|route| route.id.as_logical()));
        let properties = json!({
            "gateway": deployment.gateway(),
            "routes": deployment.routes().routes().iter().map(|route| route.id.as_str()).collect::<Vec<_>>(),
            "fingerprint": deployment.fingerprint(),
        });
        let id = deployment.id().clone();
        self.declare(id.as_logical(), ResourceKind::Deployment, depends_on, &properties)?;
        self.gateway_mut(gateway, "deployment")?.deployments.push(deployment);
        Ok(id)
    }

    /// Declares an unbound additional stage on a gateway.
    ///
    /// The stage enters the graph when it is bound to a deployment.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CyclicDependency`] when the gateway is not
    /// declared and [`TopologyError::Configuration`] when the name is invalid
    /// or taken.
    pub fn declare_stage(
        &mut self,
        gateway: &GatewayId,
        name: &str,
        logging: LoggingPosture,
    ) -> Result<StageId, TopologyError> {
        self.declare_stage_with_role(gateway, name, StageRole::Additional, logging)
    }

    /// Binds a declared stage to a deployment of the same gateway.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnboundStage`] when the stage was never
    /// declared, [`TopologyError::CyclicDependency`] when the deployment is
    /// not declared, and [`TopologyError::Configuration`] when the stage is
    /// already bound.
    pub fn bind_deployment(
        &mut self,
        stage: &StageId,
        deployment: &DeploymentId,
    ) -> Result<(), TopologyError> {
        let (gateway_index, stage_index) =
            self.locate_stage(stage).ok_or_else(|| TopologyError::UnboundStage(stage.to_string()))?;
        let record = self
            .gateways
            .get(gateway_index)
            .ok_or_else(|| TopologyError::UnboundStage(stage.to_string()))?;
        let snapshot = record
            .deployments
            .iter()
            .find(|candidate| candidate.id() == deployment)
            .ok_or_else(|| undeclared(&format!("stage {stage}"), deployment.as_str()))?;
        let slot = record
            .stages
            .get(stage_index)
            .ok_or_else(|| TopologyError::UnboundStage(stage.to_string()))?;
        let mut bound = slot.clone();
        bound.bind(snapshot)?;
        let depends_on = vec![bound.gateway.as_logical(), deployment.as_logical()];
        self.declare(stage.as_logical(), ResourceKind::Stage, depends_on, &bound)?;
        if let Some(slot) =
            self.gateways.get_mut(gateway_index).and_then(|record| record.stages.get_mut(stage_index))
        {
            *slot = bound;
        }
        Ok(())
    }

    /// Creates an additional stage bound to `deployment`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CyclicDependency`] when the deployment is not
    /// declared and [`TopologyError::Configuration`] for an invalid or taken
    /// stage name.
    pub fn create_stage(
        &mut self,
        name: &str,
        deployment: &DeploymentId,
        logging: LoggingPosture,
    ) -> Result<StageId, TopologyError> {
        let gateway = self.deployment_gateway(deployment, name)?;
        let stage = self.declare_stage_with_role(&gateway, name, StageRole::Additional, logging)?;
        self.bind_deployment(&stage, deployment)?;
        Ok(stage)
    }

    /// Deploys the gateway into its primary stage and wires default grants.
    ///
    /// Every route in the deployment receives one grant scoped to the primary
    /// stage and one scoped to console test invocations.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the gateway already has
    /// a primary stage or has no routes.
    pub fn create_primary_stage(
        &mut self,
        gateway: &GatewayId,
        name: &str,
        logging: LoggingPosture,
    ) -> Result<StageId, TopologyError> {
        if self.gateway_record(gateway, "primary stage")?.primary_stage.is_some() {
            return Err(TopologyError::Configuration(format!(
                "gateway {} already has a primary stage",
                gateway.name()
            )));
        }
        let deployment = self.deploy(gateway)?;
        let stage = self.declare_stage_with_role(gateway, name, StageRole::Primary, logging)?;
        self.bind_deployment(&stage, &deployment)?;
        self.gateway_mut(gateway, "primary stage")?.primary_stage = Some(stage.clone());

        let (api_id, routes) = {
            let record = self.gateway_record(gateway, "primary stage")?;
            let routes: Vec<Route> = record
                .deployment(&deployment)
                .map(|snapshot| snapshot.routes().routes().to_vec())
                .unwrap_or_default();
            (record.gateway.api_id.clone(), routes)
        };
        for route in routes {
            for stage_name in [name, TEST_INVOKE_STAGE] {
                let scope = ScopeArn::new(
                    &self.environment,
                    &api_id,
                    stage_name,
                    route.method.arn_token(),
                    route.pattern.arn_resource(),
                );
                let grant = InvocationGrant::new(
                    GATEWAY_SERVICE_PRINCIPAL,
                    INVOKE_ACTION,
                    route.target.clone(),
                    scope,
                    GrantOrigin::Default,
                )?;
                let mut depends_on = vec![route.target.as_logical(), route.id.as_logical()];
                if stage_name == name {
                    depends_on.push(stage.as_logical());
                }
                self.add_grant(grant, depends_on)?;
            }
        }
        Ok(stage)
    }

    /// Looks up a stage handle by gateway and name.
    #[must_use]
    pub fn stage_id(&self, gateway: &GatewayId, name: &str) -> Option<StageId> {
        self.gateways
            .iter()
            .find(|record| &record.gateway.id == gateway)
            .and_then(|record| record.stage_named(name))
            .map(|stage| stage.id.clone())
    }

    // ------------------------------------------------------------------------
    // Keys and plans
    // ------------------------------------------------------------------------

    /// Creates an enabled key with a value derived from the environment and name.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the name is invalid or taken.
    pub fn create_key(&mut self, name: &str) -> Result<KeyId, TopologyError> {
        let value = self.derive_key_value(name);
        self.add_key(ApiKey::create(name, value)?)
    }

    /// Declares a prepared key.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the key name or value is
    /// already in use.
    pub fn add_key(&mut self, key: ApiKey) -> Result<KeyId, TopologyError> {
        if self.keys.iter().any(|existing| existing.value == key.value) {
            return Err(TopologyError::Configuration(format!(
                "api key {} reuses the value of another key",
                key.name
            )));
        }
        let properties = json!({
            "name": key.name,
            "enabled": key.enabled,
            "value_sha256": hash_parts(&[&key.value]).value,
        });
        let id = key.id.clone();
        self.declare(id.as_logical(), ResourceKind::ApiKey, Vec::new(), &properties)?;
        self.keys.push(key);
        Ok(id)
    }

    /// Returns the deterministic key value for `name` in this environment.
    #[must_use]
    pub fn derive_key_value(&self, name: &str) -> String {
        hash_parts(&["api-key", &self.environment.account, &self.environment.region, name])
            .token(KEY_VALUE_LENGTH)
    }

    /// Creates an access plan with explicit usage limits.
    ///
    /// Unlimited plans are recorded as an audit notice and a review finding.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the plan is invalid or taken.
    pub fn create_plan(&mut self, name: &str, limits: UsageLimits) -> Result<PlanId, TopologyError> {
        let plan = AccessPlan::create(name, limits)?;
        let id = plan.id.clone();
        let properties = json!({ "name": plan.name, "limits": plan.limits });
        self.declare(id.as_logical(), ResourceKind::AccessPlan, Vec::new(), &properties)?;
        if limits.is_unlimited() {
            let message = format!("access plan {name} declares unlimited usage (no throttle, no quota)");
            self.audit.record(&CompositionEvent::new(
                CompositionEventKind::UnlimitedUsage,
                Some(id.as_logical()),
                Some(ResourceKind::AccessPlan),
                message.clone(),
            ));
            self.record_finding(ReviewFinding::new(
                id.as_logical(),
                FindingKind::UnlimitedUsagePlan,
                message,
            ));
        }
        self.plans.push(plan);
        Ok(id)
    }

    /// Binds a key to a plan.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CyclicDependency`] when the plan or key is not
    /// declared and [`TopologyError::Configuration`] when already bound or
    /// when another plan admits the key on one of this plan's stages.
    pub fn bind_key(&mut self, plan: &PlanId, key: &KeyId) -> Result<(), TopologyError> {
        let subject = format!("binding of {key} to {plan}");
        let key_record = self
            .keys
            .iter()
            .find(|candidate| &candidate.id == key)
            .ok_or_else(|| undeclared(&subject, key.as_str()))?;
        let plan_record = self
            .plans
            .iter()
            .find(|candidate| &candidate.id == plan)
            .ok_or_else(|| undeclared(&subject, plan.as_str()))?;
        let mut updated = plan_record.clone();
        updated.bind_key(key_record)?;
        for stage in updated.stages() {
            self.ensure_single_plan(plan, key, stage)?;
        }
        let id = LogicalId::new(format!("{plan}#{key}"));
        let properties = json!({ "plan": plan, "key": key });
        self.declare(id, ResourceKind::PlanKeyBinding, vec![plan.as_logical(), key.as_logical()], &properties)?;
        self.replace_plan(updated);
        Ok(())
    }

    /// Binds a stage to a plan.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnboundStage`] when the stage has not been
    /// created or is not bound to a deployment,
    /// [`TopologyError::CyclicDependency`] when the plan is not declared, and
    /// [`TopologyError::Configuration`] when already bound or when one of the
    /// plan's keys is admitted to the stage by another plan.
    pub fn bind_stage(&mut self, plan: &PlanId, stage: &StageId) -> Result<(), TopologyError> {
        let stage_record = self
            .locate_stage(stage)
            .and_then(|(gateway_index, stage_index)| {
                self.gateways.get(gateway_index).and_then(|record| record.stages.get(stage_index))
            })
            .ok_or_else(|| TopologyError::UnboundStage(stage.to_string()))?;
        let plan_record = self
            .plans
            .iter()
            .find(|candidate| &candidate.id == plan)
            .ok_or_else(|| undeclared(&format!("binding of {stage} to {plan}"), plan.as_str()))?;
        let mut updated = plan_record.clone();
        updated.bind_stage(stage_record)?;
        for key in updated.keys() {
            self.ensure_single_plan(plan, key, stage)?;
        }
        let id = LogicalId::new(format!("{plan}#{stage}"));
        let properties = json!({ "plan": plan, "stage": stage });
        self.declare(
            id,
            ResourceKind::PlanStageBinding,
            vec![plan.as_logical(), stage.as_logical()],
            &properties,
        )?;
        self.replace_plan(updated);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Grants
    // ------------------------------------------------------------------------

    /// Declares an explicit invocation grant.
    ///
    /// The grant depends on its target unit, on the gateway whose API id the
    /// scope names, and on the scoped stage when that stage is declared.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CyclicDependency`] when the target unit is not
    /// declared and [`TopologyError::Configuration`] for a malformed or
    /// duplicate grant.
    pub fn grant_invoke(
        &mut self,
        principal: &str,
        action: &str,
        target: &UnitId,
        scope: ScopeArn,
    ) -> Result<GrantId, TopologyError> {
        if !self.units.contains_key(target) {
            return Err(undeclared("invocation grant", target.as_str()));
        }
        let mut depends_on = vec![target.as_logical()];
        if let Some(record) = self.gateways.iter().find(|record| record.gateway.api_id == scope.api_id) {
            depends_on.push(record.gateway.id.as_logical());
            if scope.has_literal_stage()
                && let Some(stage) = record.stage_named(&scope.stage).filter(|stage| stage.is_bound())
            {
                depends_on.push(stage.id.as_logical());
            }
        }
        let grant = InvocationGrant::new(principal, action, target.clone(), scope, GrantOrigin::Explicit)?;
        self.add_grant(grant, depends_on)
    }

    /// Grants the gateway service permission to invoke the target of
    /// `method route` through `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnboundStage`] when the stage is not created
    /// and bound, and [`TopologyError::Configuration`] when the stage's
    /// deployment has no such route.
    pub fn grant_stage_invoke(
        &mut self,
        stage: &StageId,
        method: HttpMethod,
        route: &str,
    ) -> Result<GrantId, TopologyError> {
        let pattern = PathPattern::parse(route)?;
        let (gateway_index, stage_index) =
            self.locate_stage(stage).ok_or_else(|| TopologyError::UnboundStage(stage.to_string()))?;
        let record = self
            .gateways
            .get(gateway_index)
            .ok_or_else(|| TopologyError::UnboundStage(stage.to_string()))?;
        let stage_record = record
            .stages
            .get(stage_index)
            .filter(|candidate| candidate.is_bound())
            .ok_or_else(|| TopologyError::UnboundStage(stage.to_string()))?;
        let snapshot = stage_record
            .deployment()
            .and_then(|deployment| record.deployment(deployment))
            .ok_or_else(|| TopologyError::UnboundStage(stage.to_string()))?;
        let route_record = snapshot
            .routes()
            .routes()
            .iter()
            .find(|candidate| candidate.method == method && candidate.pattern.same_shape(&pattern))
            .ok_or_else(|| {
                TopologyError::Configuration(format!(
                    "stage {} has no route {method} {pattern} to grant",
                    stage_record.name
                ))
            })?;
        let scope = ScopeArn::new(
            &self.environment,
            &record.gateway.api_id,
            &stage_record.name,
            method.arn_token(),
            route_record.pattern.arn_resource(),
        );
        let target = route_record.target.clone();
        let depends_on = vec![target.as_logical(), route_record.id.as_logical(), stage.as_logical()];
        let grant = InvocationGrant::new(
            GATEWAY_SERVICE_PRINCIPAL,
            INVOKE_ACTION,
            target,
            scope,
            GrantOrigin::Explicit,
        )?;
        self.add_grant(grant, depends_on)
    }

    // ------------------------------------------------------------------------
    // Outputs and completion
    // ------------------------------------------------------------------------

    /// Exposes the gateway's primary stage base URL as output `URL`.
    ///
    /// When the stage lives in a closed nested unit, the output depends on
    /// that unit instead of reaching into it.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnboundStage`] when the gateway has no primary
    /// stage and [`TopologyError::CyclicDependency`] when the nested unit
    /// holding it is still open.
    pub fn expose_url(&mut self, gateway: &GatewayId) -> Result<String, TopologyError> {
        let record = self.gateway_record(gateway, "output URL")?;
        let stage = record
            .primary_stage()
            .ok_or_else(|| TopologyError::UnboundStage(format!("primary stage of {}", gateway.name())))?;
        let value = format!(
            "https://{}.execute-api.{}.amazonaws.com/{}/",
            record.gateway.api_id, self.environment.region, stage.name
        );
        let stage_id = stage.id.as_logical();
        let stage_scope = self
            .graph
            .get(&stage_id)
            .map(|node| node.scope.clone())
            .ok_or_else(|| TopologyError::UnboundStage(stage_id.to_string()))?;
        let dependency =
            if stage_scope == self.scope { stage_id } else { nested_unit_id(&stage_scope) };
        let id = LogicalId::new(format!("output/{URL_OUTPUT}"));
        let properties = json!({ "name": URL_OUTPUT, "value": value });
        self.declare(id.clone(), ResourceKind::Output, vec![dependency], &properties)?;
        self.outputs.push(StackOutput {
            name: URL_OUTPUT.to_string(),
            logical_id: id,
            value: value.clone(),
        });
        Ok(value)
    }

    /// Completes the pass, renders the manifest, and returns the topology.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when a nested unit is still
    /// open or the manifest cannot be rendered.
    pub fn finish(mut self, isolation: IsolationMode) -> Result<Topology, TopologyError> {
        if self.scope != ROOT_SCOPE {
            return Err(TopologyError::Configuration(format!(
                "nested unit {} was never closed",
                self.scope
            )));
        }
        let unbound_keys: Vec<ReviewFinding> = self
            .keys
            .iter()
            .filter(|key| !self.plans.iter().any(|plan| plan.keys().contains(&key.id)))
            .map(|key| {
                ReviewFinding::new(
                    key.id.as_logical(),
                    FindingKind::UnboundKey,
                    format!("api key {} is not bound to any access plan", key.name),
                )
            })
            .collect();
        let idle_plans: Vec<ReviewFinding> = self
            .plans
            .iter()
            .filter(|plan| plan.stages().is_empty())
            .map(|plan| {
                ReviewFinding::new(
                    plan.id.as_logical(),
                    FindingKind::PlanWithoutStages,
                    format!("access plan {} is bound to no stage and grants no quota", plan.name),
                )
            })
            .collect();
        for finding in unbound_keys.into_iter().chain(idle_plans) {
            self.record_finding(finding);
        }

        let manifest = TopologyManifest::render(
            &self.graph,
            isolation,
            &self.environment,
            self.outputs.clone(),
            self.findings.clone(),
        )?;
        self.audit.record(&CompositionEvent::new(
            CompositionEventKind::CompositionCompleted,
            None,
            None,
            format!(
                "composed {} resources ({} findings), fingerprint {}",
                self.graph.len(),
                self.findings.len(),
                manifest.fingerprint.value
            ),
        ));
        Ok(Topology {
            environment: self.environment,
            isolation,
            graph: self.graph,
            manifest,
            identities: self.identities,
            packages: self.packages,
            units: self.units,
            gateways: self.gateways,
            keys: self.keys,
            plans: self.plans,
            grants: self.grants,
        })
    }

    // ------------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------------

    /// Appends a node in the current scope and records the declaration.
    fn declare<T: Serialize + ?Sized>(
        &mut self,
        id: LogicalId,
        kind: ResourceKind,
        depends_on: Vec<LogicalId>,
        properties: &T,
    ) -> Result<(), TopologyError> {
        let properties = serde_json::to_value(properties)
            .map_err(|err| TopologyError::Configuration(format!("{id}: {err}")))?;
        let node = ResourceNode::new(id.clone(), kind, depends_on, properties).in_scope(self.scope.clone());
        self.graph.add(node)?;
        self.audit.record(&CompositionEvent::new(
            CompositionEventKind::ResourceDeclared,
            Some(id),
            Some(kind),
            format!("declared {} in {}", kind.as_str(), self.scope),
        ));
        Ok(())
    }

    /// Stores a finding and records it on the audit sink.
    fn record_finding(&mut self, finding: ReviewFinding) {
        self.audit.record(&CompositionEvent::new(
            CompositionEventKind::ReviewFinding,
            Some(finding.subject.clone()),
            None,
            format!("{}: {}", finding.kind.as_str(), finding.message),
        ));
        self.findings.push(finding);
    }

    /// Appends a grant node and stores the grant.
    fn add_grant(
        &mut self,
        grant: InvocationGrant,
        depends_on: Vec<LogicalId>,
    ) -> Result<GrantId, TopologyError> {
        let id = grant.id.clone();
        self.declare(id.as_logical(), ResourceKind::InvocationGrant, depends_on, &grant)?;
        self.grants.push(grant);
        Ok(id)
    }

    /// Returns a gateway record or an undeclared-reference error.
    fn gateway_record(&self, gateway: &GatewayId, subject: &str) -> Result<&GatewayRecord, TopologyError> {
        self.gateways
            .iter()
            .find(|record| &record.gateway.id == gateway)
            .ok_or_else(|| undeclared(subject, gateway.as_str()))
    }

    /// Returns a mutable gateway record or an undeclared-reference error.
    fn gateway_mut(
        &mut self,
        gateway: &GatewayId,
        subject: &str,
    ) -> Result<&mut GatewayRecord, TopologyError> {
        self.gateways
            .iter_mut()
            .find(|record| &record.gateway.id == gateway)
            .ok_or_else(|| undeclared(subject, gateway.as_str()))
    }

    /// Declares a stage record without binding it.
    fn declare_stage_with_role(
        &mut self,
        gateway: &GatewayId,
        name: &str,
        role: StageRole,
        logging: LoggingPosture,
    ) -> Result<StageId, TopologyError> {
        if name == TEST_INVOKE_STAGE {
            return Err(TopologyError::Configuration(format!("stage name {name} is reserved")));
        }
        let record = self.gateway_mut(gateway, &format!("stage {name}"))?;
        if record.stage_named(name).is_some() {
            return Err(TopologyError::Configuration(format!(
                "stage {name} already exists on {}",
                gateway.name()
            )));
        }
        let stage = Stage::declare(gateway, name, role, logging)?;
        let id = stage.id.clone();
        record.stages.push(stage);
        Ok(id)
    }

    /// Finds `(gateway index, stage index)` of a declared stage.
    fn locate_stage(&self, stage: &StageId) -> Option<(usize, usize)> {
        self.gateways.iter().enumerate().find_map(|(gateway_index, record)| {
            record
                .stages
                .iter()
                .position(|candidate| &candidate.id == stage)
                .map(|stage_index| (gateway_index, stage_index))
        })
    }

    /// Returns the gateway owning a deployment.
    fn deployment_gateway(
        &self,
        deployment: &DeploymentId,
        stage: &str,
    ) -> Result<GatewayId, TopologyError> {
        self.gateways
            .iter()
            .find(|record| record.deployment(deployment).is_some())
            .map(|record| record.gateway.id.clone())
            .ok_or_else(|| undeclared(&format!("stage {stage}"), deployment.as_str()))
    }

    /// Rejects a key reaching one stage through two plans.
    fn ensure_single_plan(
        &self,
        plan: &PlanId,
        key: &KeyId,
        stage: &StageId,
    ) -> Result<(), TopologyError> {
        match self.plans.iter().find(|other| &other.id != plan && other.admits(key, stage)) {
            Some(other) => Err(TopologyError::Configuration(format!(
                "key {key} is already admitted to stage {stage} by access plan {}",
                other.name
            ))),
            None => Ok(()),
        }
    }

    /// Replaces a plan record after a successful binding.
    fn replace_plan(&mut self, updated: AccessPlan) {
        if let Some(slot) = self.plans.iter_mut().find(|candidate| candidate.id == updated.id) {
            *slot = updated;
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the logical id of the nested unit wrapping `scope`.
fn nested_unit_id(scope: &str) -> LogicalId {
    LogicalId::new(format!("nested/{scope}"))
}

/// Builds the error for a reference to a resource that is not declared yet.
fn undeclared(subject: &str, reference: &str) -> TopologyError {
    TopologyError::CyclicDependency(format!(
        "{subject} references {reference}, which is not declared before it"
    ))
}
