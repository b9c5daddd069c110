// crates/gateway-topology-core/src/core/manifest.rs
// ============================================================================
// Module: Topology Manifest
// Description: Ordered, fingerprinted rendering of a composed topology.
// Purpose: Hand the provisioning collaborator one deterministic artifact.
// Dependencies: crate::core::{environment, graph, hashing, review, spec}, serde
// ============================================================================

//! ## Overview
//! The manifest lists resources in build order with their dependencies and
//! properties, the stack outputs, and the review findings. Its fingerprint
//! is the SHA-256 of the RFC 8785 canonical JSON of everything except the
//! fingerprint itself, so identical declarations yield identical manifests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::environment::DeploymentEnvironment;
use crate::core::error::TopologyError;
use crate::core::graph::ResourceGraph;
use crate::core::graph::ResourceNode;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::LogicalId;
use crate::core::review::ReviewFinding;
use crate::core::spec::IsolationMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Manifest format version.
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

// ============================================================================
// SECTION: Outputs
// ============================================================================

/// Externally visible composition output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    /// Output name, e.g. `URL`.
    pub name: String,
    /// Graph node backing the output.
    pub logical_id: LogicalId,
    /// Output value.
    pub value: String,
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Fingerprinted body of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestBody {
    /// Format version.
    pub format_version: u32,
    /// Placement mode.
    pub isolation: IsolationMode,
    /// Account/region context.
    pub environment: DeploymentEnvironment,
    /// Resources in build order.
    pub resources: Vec<ResourceNode>,
    /// Stack outputs.
    pub outputs: Vec<StackOutput>,
    /// Review findings, in discovery order.
    pub findings: Vec<ReviewFinding>,
}

/// Synthesized topology manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyManifest {
    /// Manifest body.
    #[serde(flatten)]
    pub body: ManifestBody,
    /// Canonical fingerprint of `body`.
    pub fingerprint: HashDigest,
}

impl TopologyManifest {
    /// Renders a manifest from a composed graph.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::CyclicDependency`] when the graph has no build
    /// order and [`TopologyError::Configuration`] when canonicalization fails.
    pub fn render(
        graph: &ResourceGraph,
        isolation: IsolationMode,
        environment: &DeploymentEnvironment,
        outputs: Vec<StackOutput>,
        findings: Vec<ReviewFinding>,
    ) -> Result<Self, TopologyError> {
        let order = graph.build_order()?;
        let resources: Vec<ResourceNode> =
            order.into_iter().filter_map(|id| graph.get(id).cloned()).collect();
        let body = ManifestBody {
            format_version: MANIFEST_FORMAT_VERSION,
            isolation,
            environment: environment.clone(),
            resources,
            outputs,
            findings,
        };
        let fingerprint = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &body)
            .map_err(|err| TopologyError::Configuration(err.to_string()))?;
        Ok(Self {
            body,
            fingerprint,
        })
    }

    /// Recomputes the fingerprint and compares it with the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when canonicalization fails.
    pub fn verify_fingerprint(&self) -> Result<bool, TopologyError> {
        let digest = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &self.body)
            .map_err(|err| TopologyError::Configuration(err.to_string()))?;
        Ok(digest == self.fingerprint)
    }

    /// Returns the output named `name`.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&StackOutput> {
        self.body.outputs.iter().find(|output| output.name == name)
    }
}
