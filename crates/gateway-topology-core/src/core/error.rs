// crates/gateway-topology-core/src/core/error.rs
// ============================================================================
// Module: Gateway Topology Errors
// Description: Composition-time error taxonomy.
// Purpose: Classify every failure detectable before provisioning begins.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! All errors in this module are raised while the resource graph is being
//! built and are fatal to the build: no partial graph is ever emitted.
//!
//! Missing invocation grants are deliberately absent from this taxonomy.
//! Grant completeness cannot be checked without simulating the platform's
//! authorization step, so it surfaces as a permission-denied invoke outcome
//! (see [`crate::runtime::simulator`]) and must be documented to operators as
//! a class of error the composition layer cannot catch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Composition-time topology errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Malformed or missing required fields.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A route with the same path pattern and method already exists.
    #[error("duplicate route: {method} {path} already declared on {gateway}")]
    DuplicateRoute {
        /// Gateway the route was added to.
        gateway: String,
        /// Path pattern of the colliding route.
        path: String,
        /// HTTP method of the colliding route.
        method: String,
    },
    /// An attached package does not support the compute unit runtime.
    #[error("package {package} is not compatible with runtime {runtime}")]
    VersionMismatch {
        /// Package name.
        package: String,
        /// Runtime version declared by the compute unit.
        runtime: String,
    },
    /// A stage was referenced before it was created and bound.
    #[error("stage {0} has not been created or is not bound to a deployment")]
    UnboundStage(String),
    /// A dependency edge would point at an undeclared or later resource.
    #[error("cyclic dependency: {0}")]
    CyclicDependency(String),
}

impl TopologyError {
    /// Returns a stable snake-case label for the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::DuplicateRoute {
                ..
            } => "duplicate_route",
            Self::VersionMismatch {
                ..
            } => "version_mismatch",
            Self::UnboundStage(_) => "unbound_stage",
            Self::CyclicDependency(_) => "cyclic_dependency",
        }
    }
}
