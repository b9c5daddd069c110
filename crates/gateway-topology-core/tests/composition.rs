// crates/gateway-topology-core/tests/composition.rs
// ============================================================================
// Module: Root Composition Tests
// Description: End-to-end composition of the reference topology.
// Purpose: Validate placement, ordering, outputs, findings, and audit events.
// ============================================================================

//! Composition tests for nested and flat placement of the reference topology.

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

use gateway_topology_core::CompositionEventKind;
use gateway_topology_core::DeclaredAssetInventory;
use gateway_topology_core::DeploymentEnvironment;
use gateway_topology_core::FindingKind;
use gateway_topology_core::IsolationMode;
use gateway_topology_core::LogicalId;
use gateway_topology_core::MemoryAuditSink;
use gateway_topology_core::NoopAuditSink;
use gateway_topology_core::ResourceKind;
use gateway_topology_core::RuntimeVersion;
use gateway_topology_core::Topology;
use gateway_topology_core::TopologyError;
use gateway_topology_core::TopologySpec;
use gateway_topology_core::compose;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn environment() -> DeploymentEnvironment {
    DeploymentEnvironment::new("123456789012", "us-east-1").unwrap()
}

fn inventory() -> DeclaredAssetInventory {
    DeclaredAssetInventory::new().with_file("src", "app.py")
}

fn compose_reference(isolation: IsolationMode) -> Topology {
    let spec = TopologySpec {
        isolation,
        ..TopologySpec::default()
    };
    compose(&spec, environment(), &inventory(), &NoopAuditSink).unwrap()
}

// ============================================================================
// SECTION: Placement
// ============================================================================

#[test]
fn nested_placement_keeps_only_unit_and_output_in_root() {
    let topology = compose_reference(IsolationMode::Nested);
    let root: Vec<&LogicalId> = topology
        .graph()
        .nodes()
        .iter()
        .filter(|node| node.scope == "root")
        .map(|node| &node.id)
        .collect();
    assert_eq!(root, vec![&LogicalId::new("nested/FastapiStack"), &LogicalId::new("output/URL")]);

    let nested = topology.graph().get(&LogicalId::new("nested/FastapiStack")).unwrap();
    assert_eq!(nested.kind, ResourceKind::NestedUnit);
    assert_eq!(nested.depends_on.len(), topology.graph().len() - 2);

    let output = topology.graph().get(&LogicalId::new("output/URL")).unwrap();
    assert_eq!(output.depends_on, vec![LogicalId::new("nested/FastapiStack")]);
}

#[test]
fn flat_placement_declares_everything_in_root() {
    let topology = compose_reference(IsolationMode::Flat);
    assert!(topology.graph().nodes().iter().all(|node| node.scope == "root"));
    assert_eq!(topology.graph().of_kind(ResourceKind::NestedUnit).count(), 0);
    let output = topology.graph().get(&LogicalId::new("output/URL")).unwrap();
    assert_eq!(output.depends_on, vec![LogicalId::new("stage/fastapi-sample-apigw/dev")]);
}

#[test]
fn reference_topology_declares_expected_resources() {
    let topology = compose_reference(IsolationMode::Nested);
    let graph = topology.graph();
    assert_eq!(graph.of_kind(ResourceKind::Identity).count(), 1);
    assert_eq!(graph.of_kind(ResourceKind::Package).count(), 1);
    assert_eq!(graph.of_kind(ResourceKind::ComputeUnit).count(), 1);
    assert_eq!(graph.of_kind(ResourceKind::Route).count(), 3);
    assert_eq!(graph.of_kind(ResourceKind::Deployment).count(), 2);
    assert_eq!(graph.of_kind(ResourceKind::Stage).count(), 2);
    // Three routes on dev and test invocations, one explicit prod grant.
    assert_eq!(graph.of_kind(ResourceKind::InvocationGrant).count(), 7);
    assert_eq!(graph.of_kind(ResourceKind::PlanKeyBinding).count(), 1);
    assert_eq!(graph.of_kind(ResourceKind::PlanStageBinding).count(), 2);

    let unit = topology.unit(&"unit/fastapi_sample".into()).unwrap();
    assert_eq!(unit.runtime, RuntimeVersion::new("python3.11"));
    assert_eq!(unit.entry_point.to_string(), "app.handler");
    let identity = topology.identity(&unit.identity).unwrap();
    assert_eq!(identity.name, "fastapi-sample-lambda-role");
    assert_eq!(identity.policy_name, "loggingRole");
}

#[test]
fn url_output_names_primary_stage() {
    let topology = compose_reference(IsolationMode::Nested);
    let gateway = topology.primary_gateway().unwrap();
    let expected =
        format!("https://{}.execute-api.us-east-1.amazonaws.com/dev/", gateway.gateway.api_id);
    assert_eq!(topology.url(), Some(expected.as_str()));
    assert_eq!(gateway.primary_stage().map(|stage| stage.name.as_str()), Some("dev"));
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

#[test]
fn manifest_is_deterministic_and_verifiable() {
    let first = compose_reference(IsolationMode::Nested);
    let second = compose_reference(IsolationMode::Nested);
    assert_eq!(first.manifest().fingerprint, second.manifest().fingerprint);
    assert!(first.manifest().verify_fingerprint().unwrap());

    let flat = compose_reference(IsolationMode::Flat);
    assert_ne!(first.manifest().fingerprint, flat.manifest().fingerprint);
}

#[test]
fn manifest_lists_dependencies_before_dependents() {
    let topology = compose_reference(IsolationMode::Nested);
    let resources = &topology.manifest().body.resources;
    for (position, node) in resources.iter().enumerate() {
        for dep in &node.depends_on {
            let dep_position = resources.iter().position(|candidate| &candidate.id == dep).unwrap();
            assert!(dep_position < position, "{dep} must precede {}", node.id);
        }
    }
}

#[test]
fn manifest_never_contains_key_values() {
    let topology = compose_reference(IsolationMode::Nested);
    let rendered = serde_json::to_string(topology.manifest()).unwrap();
    let key = topology.key_named("fastapi-sample-apikey").unwrap();
    assert!(!rendered.contains(&key.value));
}

// ============================================================================
// SECTION: Findings and Audit
// ============================================================================

#[test]
fn reference_topology_reports_review_findings() {
    let topology = compose_reference(IsolationMode::Nested);
    let kinds: Vec<FindingKind> =
        topology.manifest().body.findings.iter().map(|finding| finding.kind).collect();
    assert!(kinds.contains(&FindingKind::WildcardResource));
    assert!(kinds.contains(&FindingKind::UnlimitedUsagePlan));
    assert_eq!(kinds.iter().filter(|kind| **kind == FindingKind::KeyEnforcementSkipped).count(), 2);
    assert!(!kinds.contains(&FindingKind::UnboundKey));
    assert!(!kinds.contains(&FindingKind::PlanWithoutStages));
}

#[test]
fn key_gated_docs_routes_produce_no_skip_findings() {
    let spec = TopologySpec {
        public_docs_routes: false,
        ..TopologySpec::default()
    };
    let topology = compose(&spec, environment(), &inventory(), &NoopAuditSink).unwrap();
    assert!(
        topology
            .manifest()
            .body
            .findings
            .iter()
            .all(|finding| finding.kind != FindingKind::KeyEnforcementSkipped)
    );
}

#[test]
fn unused_keys_and_plans_are_reported() {
    let mut spec = TopologySpec::default();
    spec.access_plans[0].keys.clear();
    spec.access_plans[0].stages.clear();
    let topology = compose(&spec, environment(), &inventory(), &NoopAuditSink).unwrap();
    let kinds: Vec<FindingKind> =
        topology.manifest().body.findings.iter().map(|finding| finding.kind).collect();
    assert!(kinds.contains(&FindingKind::UnboundKey));
    assert!(kinds.contains(&FindingKind::PlanWithoutStages));
}

#[test]
fn audit_sink_records_declarations_and_completion() {
    let audit = MemoryAuditSink::new();
    let topology = compose(&TopologySpec::default(), environment(), &inventory(), &audit).unwrap();
    let events = audit.events();
    let declared =
        events.iter().filter(|event| event.kind == CompositionEventKind::ResourceDeclared).count();
    assert_eq!(declared, topology.graph().len());
    assert!(events.iter().any(|event| event.kind == CompositionEventKind::UnlimitedUsage));
    assert_eq!(events.last().map(|event| event.kind), Some(CompositionEventKind::CompositionCompleted));
}

// ============================================================================
// SECTION: Failures
// ============================================================================

#[test]
fn missing_entry_point_aborts_composition() {
    let audit = MemoryAuditSink::new();
    let empty = DeclaredAssetInventory::new();
    let result = compose(&TopologySpec::default(), environment(), &empty, &audit);
    assert!(matches!(result, Err(TopologyError::Configuration(_))));
    let events = audit.events();
    assert_eq!(events.last().map(|event| event.kind), Some(CompositionEventKind::CompositionFailed));
    assert!(events.iter().all(|event| event.kind != CompositionEventKind::CompositionCompleted));
}

#[test]
fn incompatible_package_is_a_version_mismatch() {
    let mut spec = TopologySpec::default();
    spec.function.runtime = RuntimeVersion::new("python3.12");
    let result = compose(&spec, environment(), &inventory(), &NoopAuditSink);
    assert_eq!(
        result.err(),
        Some(TopologyError::VersionMismatch {
            package: "fastapi_sample_layer".to_string(),
            runtime: "python3.12".to_string(),
        })
    );
}

#[test]
fn plan_bound_to_unknown_stage_fails_as_unbound() {
    let mut spec = TopologySpec::default();
    spec.access_plans[0].stages.push("staging".to_string());
    let result = compose(&spec, environment(), &inventory(), &NoopAuditSink);
    assert!(matches!(result, Err(TopologyError::UnboundStage(_))));
}

#[test]
fn plan_referencing_unknown_key_fails() {
    let mut spec = TopologySpec::default();
    spec.access_plans[0].keys.push("ghost".to_string());
    let result = compose(&spec, environment(), &inventory(), &NoopAuditSink);
    assert!(matches!(result, Err(TopologyError::CyclicDependency(_))));
}

#[test]
fn key_shared_by_plans_on_one_stage_is_rejected() {
    let mut spec = TopologySpec::default();
    let mut tight = spec.access_plans[0].clone();
    tight.name = "tight".to_string();
    spec.access_plans.insert(0, tight);
    let result = compose(&spec, environment(), &inventory(), &NoopAuditSink);
    assert!(matches!(result, Err(TopologyError::Configuration(message)) if message.contains("tight")));

    spec.access_plans[0].stages = vec!["dev".to_string()];
    spec.access_plans[1].stages = vec!["prod".to_string()];
    let topology = compose(&spec, environment(), &inventory(), &NoopAuditSink).unwrap();
    assert_eq!(topology.plans().len(), 2);
}

#[test]
fn grant_for_route_outside_deployment_is_rejected() {
    let mut spec = TopologySpec::default();
    spec.stages[0].grants[0].route = "/missing".to_string();
    let result = compose(&spec, environment(), &inventory(), &NoopAuditSink);
    assert!(matches!(result, Err(TopologyError::Configuration(_))));
}

#[test]
fn invalid_environment_is_rejected() {
    let environment = DeploymentEnvironment {
        account: "12".to_string(),
        region: "us-east-1".to_string(),
    };
    let result = compose(&TopologySpec::default(), environment, &inventory(), &NoopAuditSink);
    assert!(matches!(result, Err(TopologyError::Configuration(_))));
}
