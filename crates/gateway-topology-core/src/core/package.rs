// crates/gateway-topology-core/src/core/package.rs
// ============================================================================
// Module: Runtime Package Reference
// Description: Versioned shared dependency bundles (layers).
// Purpose: Declare bundles and their runtime compatibility.
// Dependencies: crate::core::{error, identifiers}, serde
// ============================================================================

//! ## Overview
//! A runtime package reference is only a pointer: declaring one registers it
//! in the graph and nothing else. The external packaging collaborator uploads
//! the bundle when the composition is built. Packages are shared by
//! reference, so several compute units may attach the same one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::TopologyError;
use crate::core::identifiers::PackageId;

// ============================================================================
// SECTION: Runtime Versions
// ============================================================================

/// Runtime family, used to locate entry-point modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFamily {
    /// Python runtimes (`python3.x`).
    Python,
    /// Node.js runtimes (`nodejs<N>.x`).
    Node,
    /// Any other runtime; entry points are not resolved to files.
    Other,
}

/// Runtime identifier such as `python3.11`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeVersion(String);

impl RuntimeVersion {
    /// Creates a new runtime identifier.
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Returns the runtime identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the runtime family.
    #[must_use]
    pub fn family(&self) -> RuntimeFamily {
        if self.0.starts_with("python") {
            RuntimeFamily::Python
        } else if self.0.starts_with("nodejs") {
            RuntimeFamily::Node
        } else {
            RuntimeFamily::Other
        }
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RuntimeVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Bundle Locations
// ============================================================================

/// Location of a source bundle, relative to the asset root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleLocation(String);

impl BundleLocation {
    /// Creates a bundle location.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the location as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates that the location is a non-empty relative path without
    /// parent traversal.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the location is unusable.
    pub fn validate(&self, owner: &str) -> Result<(), TopologyError> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            return Err(TopologyError::Configuration(format!(
                "{owner} bundle location must be non-empty"
            )));
        }
        if trimmed.starts_with('/') || trimmed.split(['/', '\\']).any(|part| part == "..") {
            return Err(TopologyError::Configuration(format!(
                "{owner} bundle location must be relative and stay inside the asset root"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for BundleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BundleLocation {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Package Reference
// ============================================================================

/// Shared runtime dependency bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimePackageReference {
    /// Package handle.
    pub id: PackageId,
    /// Layer version name.
    pub name: String,
    /// Bundle uploaded by the packaging collaborator.
    pub bundle: BundleLocation,
    /// Runtimes the bundle is built for.
    pub compatible_runtimes: Vec<RuntimeVersion>,
    /// Optional description.
    pub description: Option<String>,
}

impl RuntimePackageReference {
    /// Declares a package reference.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the name is empty, the
    /// bundle location is invalid, or no compatible runtime is listed.
    pub fn declare(
        name: impl Into<String>,
        bundle: BundleLocation,
        compatible_runtimes: Vec<RuntimeVersion>,
    ) -> Result<Self, TopologyError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TopologyError::Configuration("package name must be non-empty".into()));
        }
        bundle.validate(&format!("package {name}"))?;
        if compatible_runtimes.is_empty() {
            return Err(TopologyError::Configuration(format!(
                "package {name} must list at least one compatible runtime"
            )));
        }
        Ok(Self {
            id: PackageId::for_name(&name),
            name,
            bundle,
            compatible_runtimes,
            description: None,
        })
    }

    /// Sets the package description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true when the package can be attached to `runtime`.
    #[must_use]
    pub fn supports(&self, runtime: &RuntimeVersion) -> bool {
        self.compatible_runtimes.contains(runtime)
    }
}
