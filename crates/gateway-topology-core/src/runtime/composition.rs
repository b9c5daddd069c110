// crates/gateway-topology-core/src/runtime/composition.rs
// ============================================================================
// Module: Root Composition
// Description: Composes a full topology from a topology declaration.
// Purpose: Drive the builder in the required order for one pass.
// Dependencies: crate::{core, interfaces, runtime::builder}
// ============================================================================

//! ## Overview
//! [`compose`] declares, in order: identity, runtime packages, compute unit,
//! gateway and routes, primary stage (with default grants), additional
//! stages with their explicit grants, keys, and access plans. In nested
//! isolation all of it is declared inside one nested unit and the root only
//! holds the nested unit and the `URL` output. Any failure aborts the pass,
//! is recorded on the audit sink, and yields no topology.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::access::ApiKey;
use crate::core::compute::ComputeUnitParams;
use crate::core::environment::DeploymentEnvironment;
use crate::core::error::TopologyError;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::PackageId;
use crate::core::identifiers::StageId;
use crate::core::identity::IdentityDescriptor;
use crate::core::package::RuntimePackageReference;
use crate::core::routing::HttpMethod;
use crate::core::routing::PathPattern;
use crate::core::spec::DOCS_ROUTES;
use crate::core::spec::IsolationMode;
use crate::core::spec::TopologySpec;
use crate::interfaces::AssetInventory;
use crate::interfaces::CompositionAuditSink;
use crate::interfaces::CompositionEvent;
use crate::interfaces::CompositionEventKind;
use crate::runtime::builder::TopologyBuilder;
use crate::runtime::topology::Topology;

// ============================================================================
// SECTION: Composition
// ============================================================================

/// Composes the topology described by `spec` in `environment`.
///
/// # Errors
///
/// Returns the first [`TopologyError`] raised while declaring resources.
/// The failure is recorded on `audit` before returning.
pub fn compose(
    spec: &TopologySpec,
    environment: DeploymentEnvironment,
    inventory: &dyn AssetInventory,
    audit: &dyn CompositionAuditSink,
) -> Result<Topology, TopologyError> {
    let mut builder = TopologyBuilder::new(environment, inventory, audit);
    match declare_all(&mut builder, spec) {
        Ok(()) => builder.finish(spec.isolation).inspect_err(|err| record_failure(audit, err)),
        Err(err) => {
            record_failure(audit, &err);
            Err(err)
        }
    }
}

/// Records an aborted composition pass.
fn record_failure(audit: &dyn CompositionAuditSink, err: &TopologyError) {
    audit.record(&CompositionEvent::new(
        CompositionEventKind::CompositionFailed,
        None,
        None,
        format!("{}: {err}", err.kind()),
    ));
}

/// Declares every resource of `spec` through `builder`.
fn declare_all(builder: &mut TopologyBuilder<'_>, spec: &TopologySpec) -> Result<(), TopologyError> {
    spec.validate()?;
    builder.environment().validate()?;
    if spec.isolation == IsolationMode::Nested {
        builder.enter_scope(&spec.nested_unit_name)?;
    }

    let identity_spec = &spec.identity;
    let mut descriptor = IdentityDescriptor::create(
        &identity_spec.name,
        &identity_spec.trusted_principal,
        identity_spec.statements.clone(),
    )?
    .with_policy_name(&identity_spec.policy_name);
    if let Some(description) = &identity_spec.description {
        descriptor = descriptor.with_description(description);
    }
    let identity = builder.add_identity(descriptor)?;

    let mut packages: BTreeMap<&str, PackageId> = BTreeMap::new();
    for package_spec in &spec.packages {
        let mut package = RuntimePackageReference::declare(
            &package_spec.name,
            package_spec.bundle.clone(),
            package_spec.compatible_runtimes.clone(),
        )?;
        if let Some(description) = &package_spec.description {
            package = package.with_description(description);
        }
        packages.insert(package_spec.name.as_str(), builder.add_package(package)?);
    }

    let function = &spec.function;
    let mut attached = Vec::with_capacity(function.packages.len());
    for name in &function.packages {
        let package = packages.get(name.as_str()).ok_or_else(|| {
            TopologyError::CyclicDependency(format!(
                "compute unit {} references package {name}, which is not declared",
                function.name
            ))
        })?;
        attached.push(package.clone());
    }
    let unit = builder.create_unit(
        ComputeUnitParams {
            name: function.name.clone(),
            runtime: function.runtime.clone(),
            entry_point: function.entry_point.clone(),
            bundle: function.bundle.clone(),
        },
        &identity,
        &attached,
    )?;

    let gateway_spec = &spec.gateway;
    let gateway = builder.create_gateway(
        &gateway_spec.name,
        gateway_spec.cors.clone(),
        gateway_spec.api_key_source,
        gateway_spec.endpoint,
    )?;
    let mut declared: Vec<(HttpMethod, PathPattern)> = Vec::new();
    for route in &gateway_spec.routes {
        builder.add_route(&gateway, &route.path, route.method, &unit, route.api_key_required)?;
        declared.push((route.method, PathPattern::parse(&route.path)?));
    }
    for path in DOCS_ROUTES {
        let pattern = PathPattern::parse(path)?;
        let taken = declared
            .iter()
            .any(|(method, existing)| *method == HttpMethod::Get && existing.same_shape(&pattern));
        if !taken {
            builder.add_route(&gateway, path, HttpMethod::Get, &unit, !spec.public_docs_routes)?;
        }
    }

    builder.create_primary_stage(&gateway, &spec.primary_stage.name, spec.primary_stage.logging)?;
    for stage_spec in &spec.stages {
        let deployment = builder.deploy(&gateway)?;
        let stage = builder.create_stage(&stage_spec.name, &deployment, stage_spec.logging)?;
        for grant in &stage_spec.grants {
            builder.grant_stage_invoke(&stage, grant.method, &grant.route)?;
        }
    }

    let mut keys: BTreeMap<&str, KeyId> = BTreeMap::new();
    for key_spec in &spec.api_keys {
        let value = key_spec.value.clone().unwrap_or_else(|| builder.derive_key_value(&key_spec.name));
        let mut key = ApiKey::create(&key_spec.name, value)?;
        if !key_spec.enabled {
            key = key.disabled();
        }
        keys.insert(key_spec.name.as_str(), builder.add_key(key)?);
    }

    for plan_spec in &spec.access_plans {
        let plan = builder.create_plan(&plan_spec.name, plan_spec.limits)?;
        for key_name in &plan_spec.keys {
            let key = keys.get(key_name.as_str()).ok_or_else(|| {
                TopologyError::CyclicDependency(format!(
                    "access plan {} references api key {key_name}, which is not declared",
                    plan_spec.name
                ))
            })?;
            builder.bind_key(&plan, key)?;
        }
        for stage_name in &plan_spec.stages {
            builder.bind_stage(&plan, &StageId::for_stage(&gateway, stage_name))?;
        }
    }

    if spec.isolation == IsolationMode::Nested {
        builder.close_scope()?;
    }
    builder.expose_url(&gateway)?;
    Ok(())
}
