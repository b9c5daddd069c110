// crates/gateway-topology-core/src/core/compute.rs
// ============================================================================
// Module: Compute Unit
// Description: Invocable function bound to one identity and shared packages.
// Purpose: Enforce identity trust, runtime compatibility, and entry points.
// Dependencies: crate::core::{error, identifiers, identity, package}, crate::interfaces
// ============================================================================

//! ## Overview
//! A compute unit owns exactly one identity and attaches zero or more runtime
//! packages. Creation checks three things before the unit may enter the
//! graph:
//! - the identity trusts the compute runtime service,
//! - every attached package lists the unit's runtime,
//! - the entry point resolves to a module inside the source bundle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::TopologyError;
use crate::core::identifiers::IdentityId;
use crate::core::identifiers::PackageId;
use crate::core::identifiers::UnitId;
use crate::core::identity::COMPUTE_SERVICE_PRINCIPAL;
use crate::core::identity::IdentityDescriptor;
use crate::core::package::BundleLocation;
use crate::core::package::RuntimeFamily;
use crate::core::package::RuntimePackageReference;
use crate::core::package::RuntimeVersion;
use crate::interfaces::AssetInventory;

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Handler reference in `module.function` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryPoint {
    /// Dotted module path, e.g. `app` or `service.app`.
    pub module: String,
    /// Function exported by the module.
    pub function: String,
}

impl EntryPoint {
    /// Parses a `module.function` handler reference.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when either side is missing.
    pub fn parse(handler: &str) -> Result<Self, TopologyError> {
        let Some((module, function)) = handler.trim().rsplit_once('.') else {
            return Err(TopologyError::Configuration(format!(
                "entry point {handler:?} must be in module.function form"
            )));
        };
        if module.is_empty()
            || function.is_empty()
            || module.split('.').any(|part| part.is_empty() || part == "..")
        {
            return Err(TopologyError::Configuration(format!(
                "entry point {handler:?} must be in module.function form"
            )));
        }
        Ok(Self {
            module: module.to_string(),
            function: function.to_string(),
        })
    }

    /// Returns the candidate module files for a runtime family.
    #[must_use]
    pub fn module_files(&self, family: RuntimeFamily) -> Vec<String> {
        let base = self.module.replace('.', "/");
        match family {
            RuntimeFamily::Python => vec![format!("{base}.py"), format!("{base}/__init__.py")],
            RuntimeFamily::Node => {
                vec![format!("{base}.js"), format!("{base}.mjs"), format!("{base}.cjs")]
            }
            RuntimeFamily::Other => Vec::new(),
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.function)
    }
}

impl TryFrom<String> for EntryPoint {
    type Error = TopologyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EntryPoint> for String {
    fn from(value: EntryPoint) -> Self {
        value.to_string()
    }
}

// ============================================================================
// SECTION: Compute Unit
// ============================================================================

/// Inputs describing a compute unit before it is bound to resources.
#[derive(Debug, Clone)]
pub struct ComputeUnitParams {
    /// Function name.
    pub name: String,
    /// Declared runtime.
    pub runtime: RuntimeVersion,
    /// Handler reference.
    pub entry_point: EntryPoint,
    /// Source bundle containing the handler.
    pub bundle: BundleLocation,
}

/// Named, invocable function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeUnit {
    /// Unit handle.
    pub id: UnitId,
    /// Function name.
    pub name: String,
    /// Declared runtime.
    pub runtime: RuntimeVersion,
    /// Handler reference.
    pub entry_point: EntryPoint,
    /// Source bundle containing the handler.
    pub bundle: BundleLocation,
    /// Attached packages, in attachment order.
    pub packages: Vec<PackageId>,
    /// Bound execution identity.
    pub identity: IdentityId,
}

impl ComputeUnit {
    /// Creates a compute unit bound to `identity` with `packages` attached.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::VersionMismatch`] when a package excludes the
    /// runtime, and [`TopologyError::Configuration`] when the identity does
    /// not trust the compute runtime, a package is attached twice, or the
    /// entry point does not resolve inside the bundle.
    pub fn create(
        params: ComputeUnitParams,
        identity: &IdentityDescriptor,
        packages: &[&RuntimePackageReference],
        inventory: &dyn AssetInventory,
    ) -> Result<Self, TopologyError> {
        let ComputeUnitParams {
            name,
            runtime,
            entry_point,
            bundle,
        } = params;
        if name.trim().is_empty() {
            return Err(TopologyError::Configuration("compute unit name must be non-empty".into()));
        }
        bundle.validate(&format!("compute unit {name}"))?;
        if !identity.trusts_compute_runtime() {
            return Err(TopologyError::Configuration(format!(
                "identity {} trusts {} but compute unit {name} requires {COMPUTE_SERVICE_PRINCIPAL}",
                identity.name, identity.trusted_principal
            )));
        }
        let mut attached: Vec<PackageId> = Vec::with_capacity(packages.len());
        for package in packages {
            if !package.supports(&runtime) {
                return Err(TopologyError::VersionMismatch {
                    package: package.name.clone(),
                    runtime: runtime.to_string(),
                });
            }
            if attached.contains(&package.id) {
                return Err(TopologyError::Configuration(format!(
                    "package {} is attached to {name} more than once",
                    package.name
                )));
            }
            attached.push(package.id.clone());
        }
        ensure_entry_point_resolves(&name, &runtime, &entry_point, &bundle, inventory)?;
        Ok(Self {
            id: UnitId::for_name(&name),
            name,
            runtime,
            entry_point,
            bundle,
            packages: attached,
            identity: identity.id.clone(),
        })
    }
}

/// Ensures the handler module exists in the unit's source bundle.
fn ensure_entry_point_resolves(
    name: &str,
    runtime: &RuntimeVersion,
    entry_point: &EntryPoint,
    bundle: &BundleLocation,
    inventory: &dyn AssetInventory,
) -> Result<(), TopologyError> {
    let candidates = entry_point.module_files(runtime.family());
    if candidates.is_empty() {
        return Ok(());
    }
    for candidate in &candidates {
        let found = inventory.contains(bundle, candidate).map_err(|err| {
            TopologyError::Configuration(format!("compute unit {name}: {err}"))
        })?;
        if found {
            return Ok(());
        }
    }
    Err(TopologyError::Configuration(format!(
        "entry point {entry_point} of compute unit {name} does not resolve inside bundle {bundle} \
         (looked for {})",
        candidates.join(", ")
    )))
}
