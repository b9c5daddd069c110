// crates/gateway-topology-core/tests/builder.rs
// ============================================================================
// Module: Topology Builder Tests
// Description: Ordering and cross-resource rules of the sequential builder.
// Purpose: Validate route collisions, stage binding, snapshots, and grants.
// ============================================================================

//! Builder tests covering declaration order and stage lifecycle rules.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use gateway_topology_core::ApiKeySource;
use gateway_topology_core::BundleLocation;
use gateway_topology_core::COMPUTE_SERVICE_PRINCIPAL;
use gateway_topology_core::ComputeUnitParams;
use gateway_topology_core::CorsPolicy;
use gateway_topology_core::DeclaredAssetInventory;
use gateway_topology_core::DeploymentEnvironment;
use gateway_topology_core::EndpointVisibility;
use gateway_topology_core::EntryPoint;
use gateway_topology_core::GATEWAY_SERVICE_PRINCIPAL;
use gateway_topology_core::GatewayId;
use gateway_topology_core::GrantOrigin;
use gateway_topology_core::HttpMethod;
use gateway_topology_core::INVOKE_ACTION;
use gateway_topology_core::IsolationMode;
use gateway_topology_core::LoggingPosture;
use gateway_topology_core::MemoryAuditSink;
use gateway_topology_core::PermissionStatement;
use gateway_topology_core::ResourceKind;
use gateway_topology_core::RuntimeVersion;
use gateway_topology_core::ScopeArn;
use gateway_topology_core::StageId;
use gateway_topology_core::TopologyBuilder;
use gateway_topology_core::TopologyError;
use gateway_topology_core::UnitId;
use gateway_topology_core::UsageLimits;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn environment() -> DeploymentEnvironment {
    DeploymentEnvironment::new("123456789012", "eu-west-1").unwrap()
}

fn inventory() -> DeclaredAssetInventory {
    DeclaredAssetInventory::new().with_file("src", "app.py")
}

fn params(name: &str) -> ComputeUnitParams {
    ComputeUnitParams {
        name: name.to_string(),
        runtime: RuntimeVersion::new("python3.11"),
        entry_point: EntryPoint::parse("app.handler").unwrap(),
        bundle: BundleLocation::new("src"),
    }
}

/// Declares identity, one unit, and a key-gated gateway.
fn gateway_with_unit(builder: &mut TopologyBuilder<'_>, unit: &str) -> (GatewayId, UnitId) {
    let identity = builder
        .create_identity("role", COMPUTE_SERVICE_PRINCIPAL, vec![PermissionStatement::log_write()])
        .unwrap();
    let unit = builder.create_unit(params(unit), &identity, &[]).unwrap();
    let gateway = builder
        .create_gateway(
            "api",
            Some(CorsPolicy::default()),
            Some(ApiKeySource::Header),
            EndpointVisibility::Regional,
        )
        .unwrap();
    (gateway, unit)
}

// ============================================================================
// SECTION: Routes
// ============================================================================

#[test]
fn duplicate_route_is_rejected_regardless_of_target() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, first) = gateway_with_unit(&mut builder, "first");
    let identity = builder
        .create_identity("second-role", COMPUTE_SERVICE_PRINCIPAL, vec![
            PermissionStatement::log_write(),
        ])
        .unwrap();
    let second = builder.create_unit(params("second"), &identity, &[]).unwrap();

    builder.add_route(&gateway, "/items/{id}", HttpMethod::Get, &first, true).unwrap();
    let err = builder.add_route(&gateway, "/items/{item}", HttpMethod::Get, &second, true).unwrap_err();
    assert!(matches!(err, TopologyError::DuplicateRoute { .. }));
    assert!(builder.add_route(&gateway, "/items/{id}", HttpMethod::Post, &second, true).is_ok());
}

#[test]
fn route_to_undeclared_unit_is_a_dependency_error() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, _) = gateway_with_unit(&mut builder, "fn");
    let err = builder
        .add_route(&gateway, "/x", HttpMethod::Get, &UnitId::for_name("ghost"), true)
        .unwrap_err();
    assert!(matches!(err, TopologyError::CyclicDependency(_)));
}

#[test]
fn public_route_on_key_gated_gateway_is_a_finding() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, unit) = gateway_with_unit(&mut builder, "fn");
    builder.add_route(&gateway, "/health", HttpMethod::Get, &unit, false).unwrap();
    assert!(builder.findings().iter().any(|finding| finding.subject.as_str().ends_with("GET /health")));
}

// ============================================================================
// SECTION: Deployments and Stages
// ============================================================================

#[test]
fn deployment_snapshot_ignores_later_routes() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, unit) = gateway_with_unit(&mut builder, "fn");
    builder.add_route(&gateway, "/a", HttpMethod::Get, &unit, true).unwrap();
    let first = builder.deploy(&gateway).unwrap();
    builder.add_route(&gateway, "/b", HttpMethod::Get, &unit, true).unwrap();
    let second = builder.deploy(&gateway).unwrap();
    builder.create_primary_stage(&gateway, "dev", LoggingPosture::verbose()).unwrap();
    let topology = builder.finish(IsolationMode::Flat).unwrap();

    let record = topology.gateway(&gateway).unwrap();
    assert_eq!(record.deployment(&first).unwrap().routes().len(), 1);
    assert_eq!(record.deployment(&second).unwrap().routes().len(), 2);
    assert_ne!(
        record.deployment(&first).unwrap().fingerprint(),
        record.deployment(&second).unwrap().fingerprint()
    );
}

#[test]
fn deploying_an_empty_gateway_fails() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, _) = gateway_with_unit(&mut builder, "fn");
    assert!(matches!(builder.deploy(&gateway), Err(TopologyError::Configuration(_))));
}

#[test]
fn plan_binding_requires_a_bound_stage() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, unit) = gateway_with_unit(&mut builder, "fn");
    builder.add_route(&gateway, "/{proxy+}", HttpMethod::Any, &unit, true).unwrap();
    let plan = builder.create_plan("plan", UsageLimits::Unlimited).unwrap();

    let never_created = StageId::for_stage(&gateway, "prod");
    assert_eq!(
        builder.bind_stage(&plan, &never_created),
        Err(TopologyError::UnboundStage(never_created.to_string()))
    );

    let declared = builder.declare_stage(&gateway, "prod", LoggingPosture::info()).unwrap();
    assert!(matches!(builder.bind_stage(&plan, &declared), Err(TopologyError::UnboundStage(_))));

    let deployment = builder.deploy(&gateway).unwrap();
    builder.bind_deployment(&declared, &deployment).unwrap();
    builder.bind_stage(&plan, &declared).unwrap();
    assert!(matches!(builder.bind_stage(&plan, &declared), Err(TopologyError::Configuration(_))));
}

#[test]
fn key_reaches_a_stage_through_one_plan_only() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, unit) = gateway_with_unit(&mut builder, "fn");
    builder.add_route(&gateway, "/{proxy+}", HttpMethod::Any, &unit, true).unwrap();
    let deployment = builder.deploy(&gateway).unwrap();
    let dev = builder.create_stage("dev", &deployment, LoggingPosture::info()).unwrap();
    let prod = builder.create_stage("prod", &deployment, LoggingPosture::info()).unwrap();
    let key = builder.create_key("shared").unwrap();

    let tight = builder.create_plan("tight", UsageLimits::Unlimited).unwrap();
    builder.bind_key(&tight, &key).unwrap();
    builder.bind_stage(&tight, &dev).unwrap();

    let open = builder.create_plan("open", UsageLimits::Unlimited).unwrap();
    builder.bind_key(&open, &key).unwrap();
    builder.bind_stage(&open, &prod).unwrap();
    assert!(matches!(builder.bind_stage(&open, &dev), Err(TopologyError::Configuration(_))));

    let late = builder.create_plan("late", UsageLimits::Unlimited).unwrap();
    builder.bind_stage(&late, &dev).unwrap();
    assert!(matches!(builder.bind_key(&late, &key), Err(TopologyError::Configuration(_))));
}

#[test]
fn stage_binds_exactly_once() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, unit) = gateway_with_unit(&mut builder, "fn");
    builder.add_route(&gateway, "/a", HttpMethod::Get, &unit, true).unwrap();
    let deployment = builder.deploy(&gateway).unwrap();
    let stage = builder.create_stage("qa", &deployment, LoggingPosture::default()).unwrap();
    assert!(matches!(
        builder.bind_deployment(&stage, &deployment),
        Err(TopologyError::Configuration(_))
    ));
    assert!(matches!(
        builder.create_stage("qa", &deployment, LoggingPosture::default()),
        Err(TopologyError::Configuration(_))
    ));
}

#[test]
fn primary_stage_wires_default_grants_only_for_itself() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, unit) = gateway_with_unit(&mut builder, "fn");
    builder.add_route(&gateway, "/{proxy+}", HttpMethod::Get, &unit, true).unwrap();
    builder.create_primary_stage(&gateway, "dev", LoggingPosture::verbose()).unwrap();
    let deployment = builder.deploy(&gateway).unwrap();
    builder.create_stage("prod", &deployment, LoggingPosture::info()).unwrap();
    assert!(matches!(
        builder.create_primary_stage(&gateway, "other", LoggingPosture::default()),
        Err(TopologyError::Configuration(_))
    ));
    let topology = builder.finish(IsolationMode::Flat).unwrap();

    let stages: Vec<&str> = topology.grants().iter().map(|grant| grant.scope.stage.as_str()).collect();
    assert_eq!(stages, vec!["dev", "test-invoke-stage"]);
    assert!(topology.grants().iter().all(|grant| grant.origin == GrantOrigin::Default));
}

#[test]
fn explicit_grant_depends_on_matching_gateway_and_stage() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, unit) = gateway_with_unit(&mut builder, "fn");
    builder.add_route(&gateway, "/{proxy+}", HttpMethod::Get, &unit, true).unwrap();
    let dev = builder.create_primary_stage(&gateway, "dev", LoggingPosture::verbose()).unwrap();
    let topology_env = builder.environment().clone();
    let api_id = builder
        .graph()
        .get(&gateway.as_logical())
        .and_then(|node| node.properties.get("api_id"))
        .and_then(|value| value.as_str())
        .unwrap()
        .to_string();
    let scope = ScopeArn::new(&topology_env, &api_id, "dev", "POST", "{proxy+}");
    let grant = builder.grant_invoke(GATEWAY_SERVICE_PRINCIPAL, INVOKE_ACTION, &unit, scope).unwrap();
    let node = builder.graph().get(&grant.as_logical()).unwrap();
    assert_eq!(node.kind, ResourceKind::InvocationGrant);
    assert!(node.depends_on.contains(&gateway.as_logical()));
    assert!(node.depends_on.contains(&dev.as_logical()));
    assert!(node.depends_on.contains(&unit.as_logical()));
}

// ============================================================================
// SECTION: Scopes and Outputs
// ============================================================================

#[test]
fn url_requires_primary_stage() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let (gateway, _) = gateway_with_unit(&mut builder, "fn");
    assert!(matches!(builder.expose_url(&gateway), Err(TopologyError::UnboundStage(_))));
}

#[test]
fn open_nested_scope_blocks_completion() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    builder.enter_scope("Inner").unwrap();
    let _ = gateway_with_unit(&mut builder, "fn");
    assert!(builder.enter_scope("Again").is_err());
    assert!(matches!(builder.finish(IsolationMode::Nested), Err(TopologyError::Configuration(_))));
}

#[test]
fn derived_key_values_are_stable_per_environment() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let builder = TopologyBuilder::new(environment(), &inventory, &audit);
    let other_env = DeploymentEnvironment::new("210987654321", "eu-west-1").unwrap();
    let other = TopologyBuilder::new(other_env, &inventory, &audit);
    let value = builder.derive_key_value("key");
    assert_eq!(value, builder.derive_key_value("key"));
    assert_ne!(value, other.derive_key_value("key"));
    assert!(value.len() >= gateway_topology_core::MIN_KEY_VALUE_LENGTH);
}

#[test]
fn unlimited_plan_emits_audit_notice() {
    let inventory = inventory();
    let audit = MemoryAuditSink::new();
    let mut builder = TopologyBuilder::new(environment(), &inventory, &audit);
    builder.create_plan("open", UsageLimits::Unlimited).unwrap();
    assert!(
        audit
            .events()
            .iter()
            .any(|event| event.kind == gateway_topology_core::CompositionEventKind::UnlimitedUsage)
    );
}
