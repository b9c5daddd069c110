// crates/gateway-topology-core/tests/simulator.rs
// ============================================================================
// Module: Invocation Simulator Tests
// Description: Request evaluation against composed topologies.
// Purpose: Validate stage grants, key enforcement, quotas, and preflight.
// ============================================================================

//! Simulator tests for the reference topology and its variants.

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

use gateway_topology_core::DeclaredAssetInventory;
use gateway_topology_core::DeploymentEnvironment;
use gateway_topology_core::HttpMethod;
use gateway_topology_core::InvocationOutcome;
use gateway_topology_core::InvocationRequest;
use gateway_topology_core::NoopAuditSink;
use gateway_topology_core::Quota;
use gateway_topology_core::QuotaPeriod;
use gateway_topology_core::RouteSpec;
use gateway_topology_core::Simulator;
use gateway_topology_core::Topology;
use gateway_topology_core::TopologySpec;
use gateway_topology_core::UsageLimits;
use gateway_topology_core::compose;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn compose_spec(spec: &TopologySpec) -> Topology {
    let environment = DeploymentEnvironment::new("123456789012", "us-east-1").unwrap();
    let inventory = DeclaredAssetInventory::new().with_file("src", "app.py");
    compose(spec, environment, &inventory, &NoopAuditSink).unwrap()
}

fn api_key(topology: &Topology) -> String {
    topology.key_named("fastapi-sample-apikey").unwrap().value.clone()
}

fn get(stage: &str, path: &str) -> InvocationRequest {
    InvocationRequest::new(stage, HttpMethod::Get, path)
}

// ============================================================================
// SECTION: Stage Grants
// ============================================================================

#[test]
fn reference_topology_serves_both_stages() {
    let topology = compose_spec(&TopologySpec::default());
    let key = api_key(&topology);
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();

    for stage in ["dev", "prod"] {
        let outcome = simulator.invoke(&get(stage, "/items/42").with_api_key(&key)).unwrap();
        let InvocationOutcome::Invoked {
            unit,
            captures,
            source_arn,
            ..
        } = &outcome
        else {
            panic!("expected invocation on {stage}, got {outcome:?}");
        };
        assert_eq!(unit.as_str(), "unit/fastapi_sample");
        assert_eq!(captures.proxy_path.as_deref(), Some("items/42"));
        assert!(source_arn.ends_with(&format!("/{stage}/GET/{{proxy+}}")));
    }
}

#[test]
fn additional_stage_without_grant_is_denied() {
    let mut spec = TopologySpec::default();
    spec.stages[0].grants.clear();
    let topology = compose_spec(&spec);
    let key = api_key(&topology);
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();

    let dev = simulator.invoke(&get("dev", "/items").with_api_key(&key)).unwrap();
    assert!(matches!(dev, InvocationOutcome::Invoked { .. }));

    let prod = simulator.invoke(&get("prod", "/items").with_api_key(&key)).unwrap();
    assert!(matches!(prod, InvocationOutcome::PermissionDenied { .. }));
    assert_eq!(prod.status_code(), 500);
}

#[test]
fn docs_route_on_prod_has_no_grant() {
    let topology = compose_spec(&TopologySpec::default());
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();
    let dev = simulator.invoke(&get("dev", "/docs")).unwrap();
    assert!(matches!(dev, InvocationOutcome::Invoked { .. }));
    let prod = simulator.invoke(&get("prod", "/openapi.json")).unwrap();
    assert!(matches!(prod, InvocationOutcome::PermissionDenied { .. }));
}

#[test]
fn unknown_stage_is_not_found() {
    let topology = compose_spec(&TopologySpec::default());
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();
    let outcome = simulator.invoke(&get("staging", "/items")).unwrap();
    assert_eq!(outcome, InvocationOutcome::StageNotFound {
        stage: "staging".to_string()
    });
    assert_eq!(outcome.status_code(), 403);
}

// ============================================================================
// SECTION: Key Enforcement
// ============================================================================

#[test]
fn key_gated_route_rejects_missing_unknown_and_disabled_keys() {
    let topology = compose_spec(&TopologySpec::default());
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();
    let missing = simulator.invoke(&get("dev", "/items")).unwrap();
    assert!(matches!(missing, InvocationOutcome::Forbidden { .. }));
    let unknown =
        simulator.invoke(&get("dev", "/items").with_api_key("notarealkeynotarealkey")).unwrap();
    assert!(matches!(unknown, InvocationOutcome::Forbidden { .. }));

    let mut spec = TopologySpec::default();
    spec.api_keys[0].enabled = false;
    let disabled_topology = compose_spec(&spec);
    let key = api_key(&disabled_topology);
    let mut disabled = Simulator::for_primary_gateway(&disabled_topology).unwrap();
    let outcome = disabled.invoke(&get("dev", "/items").with_api_key(&key)).unwrap();
    assert_eq!(outcome, InvocationOutcome::Forbidden {
        reason: "api key is disabled".to_string()
    });
}

#[test]
fn key_must_be_admitted_to_the_stage() {
    let mut spec = TopologySpec::default();
    spec.access_plans[0].stages = vec!["dev".to_string()];
    let topology = compose_spec(&spec);
    let key = api_key(&topology);
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();
    let outcome = simulator.invoke(&get("prod", "/items").with_api_key(&key)).unwrap();
    assert!(matches!(outcome, InvocationOutcome::Forbidden { .. }));
}

#[test]
fn quota_is_enforced_per_plan_and_key() {
    let mut spec = TopologySpec::default();
    spec.access_plans[0].limits = UsageLimits::Limited {
        throttle: None,
        quota: Some(Quota {
            limit: 2,
            period: QuotaPeriod::Day,
        }),
    };
    let topology = compose_spec(&spec);
    let key = api_key(&topology);
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();
    let request = get("dev", "/items").with_api_key(&key);

    assert!(simulator.invoke(&request).unwrap().is_success());
    assert!(simulator.invoke(&request).unwrap().is_success());
    let third = simulator.invoke(&request).unwrap();
    assert!(matches!(third, InvocationOutcome::QuotaExceeded { .. }));
    assert_eq!(third.status_code(), 429);

    let plan = &topology.plans()[0].id;
    let key_id = &topology.keys()[0].id;
    assert_eq!(simulator.usage(plan, key_id), 2);
}

// ============================================================================
// SECTION: Routing
// ============================================================================

#[test]
fn literal_route_beats_greedy_route() {
    let mut spec = TopologySpec::default();
    spec.gateway.routes = vec![
        RouteSpec {
            path: "/{proxy+}".to_string(),
            method: HttpMethod::Any,
            api_key_required: true,
        },
        RouteSpec {
            path: "/health".to_string(),
            method: HttpMethod::Get,
            api_key_required: false,
        },
    ];
    spec.stages.clear();
    spec.access_plans[0].stages = vec!["dev".to_string()];
    let topology = compose_spec(&spec);
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();

    let health = simulator.invoke(&get("dev", "/health")).unwrap();
    let InvocationOutcome::Invoked {
        route, ..
    } = &health
    else {
        panic!("expected invocation, got {health:?}");
    };
    assert!(route.as_str().ends_with("GET /health"));

    let key = api_key(&topology);
    let post = simulator
        .invoke(&InvocationRequest::new("dev", HttpMethod::Post, "/orders/7").with_api_key(&key))
        .unwrap();
    assert!(matches!(post, InvocationOutcome::Invoked { .. }));
}

#[test]
fn docs_literal_bypasses_key_while_greedy_any_requires_it() {
    let mut spec = TopologySpec::default();
    spec.gateway.routes = vec![RouteSpec {
        path: "/{proxy+}".to_string(),
        method: HttpMethod::Any,
        api_key_required: true,
    }];
    spec.stages.clear();
    spec.access_plans[0].stages = vec!["dev".to_string()];
    let topology = compose_spec(&spec);
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();

    for path in ["/docs", "/openapi.json"] {
        let outcome = simulator.invoke(&get("dev", path)).unwrap();
        let InvocationOutcome::Invoked {
            route, ..
        } = &outcome
        else {
            panic!("expected {path} to be served without a key, got {outcome:?}");
        };
        assert!(route.as_str().ends_with(&format!("GET {path}")));
    }

    let widgets = simulator.invoke(&get("dev", "/widgets")).unwrap();
    assert!(matches!(widgets, InvocationOutcome::Forbidden { .. }));
    let key = api_key(&topology);
    let served = simulator.invoke(&get("dev", "/widgets").with_api_key(&key)).unwrap();
    let InvocationOutcome::Invoked {
        route, ..
    } = &served
    else {
        panic!("expected keyed request to be served, got {served:?}");
    };
    assert!(route.as_str().ends_with("ANY /{proxy+}"));
}

#[test]
fn unmatched_method_is_not_found() {
    let topology = compose_spec(&TopologySpec::default());
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();
    let outcome = simulator.invoke(&InvocationRequest::new("dev", HttpMethod::Post, "/items")).unwrap();
    assert!(matches!(outcome, InvocationOutcome::NotFound { .. }));
}

#[test]
fn options_request_is_answered_by_cors_preflight() {
    let topology = compose_spec(&TopologySpec::default());
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();
    let outcome =
        simulator.invoke(&InvocationRequest::new("dev", HttpMethod::Options, "/items")).unwrap();
    let InvocationOutcome::CorsPreflight {
        allow_origins,
        status_code,
        ..
    } = &outcome
    else {
        panic!("expected preflight, got {outcome:?}");
    };
    assert_eq!(allow_origins, &vec!["*".to_string()]);
    assert_eq!(*status_code, 200);
}

#[test]
fn options_route_on_another_resource_keeps_preflight() {
    let mut spec = TopologySpec::default();
    spec.gateway.routes.push(RouteSpec {
        path: "/other".to_string(),
        method: HttpMethod::Options,
        api_key_required: false,
    });
    let topology = compose_spec(&spec);
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();

    let widgets =
        simulator.invoke(&InvocationRequest::new("dev", HttpMethod::Options, "/widgets")).unwrap();
    assert!(matches!(widgets, InvocationOutcome::CorsPreflight { .. }), "got {widgets:?}");

    let other =
        simulator.invoke(&InvocationRequest::new("dev", HttpMethod::Options, "/other")).unwrap();
    assert!(matches!(other, InvocationOutcome::Invoked { .. }), "got {other:?}");
}

#[test]
fn malformed_request_path_is_an_error() {
    let topology = compose_spec(&TopologySpec::default());
    let mut simulator = Simulator::for_primary_gateway(&topology).unwrap();
    assert!(simulator.invoke(&get("dev", "items")).is_err());
}
