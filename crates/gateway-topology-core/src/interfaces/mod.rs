// crates/gateway-topology-core/src/interfaces/mod.rs
// ============================================================================
// Module: Gateway Topology Interfaces
// Description: Seams to the packaging collaborator and audit pipeline.
// Purpose: Define the contract surfaces used by the composition runtime.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! The composition never touches the filesystem or a log pipeline directly.
//! Asset resolution goes through [`AssetInventory`], which is implemented by
//! whatever packages the bundles, and every composition step is reported to a
//! [`CompositionAuditSink`]. Implementations must fail closed: an inventory
//! that cannot answer returns an error rather than guessing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use thiserror::Error;

use crate::core::graph::ResourceKind;
use crate::core::identifiers::LogicalId;
use crate::core::package::BundleLocation;

// ============================================================================
// SECTION: Asset Inventory
// ============================================================================

/// Errors raised while consulting an asset inventory.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The inventory could not be read.
    #[error("asset inventory io error: {0}")]
    Io(String),
    /// The requested path was rejected.
    #[error("invalid asset path: {0}")]
    Invalid(String),
}

/// Read-only view of the bundles the packaging collaborator will upload.
pub trait AssetInventory {
    /// Returns true when `relative_path` exists inside `bundle`.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError`] when the inventory cannot be consulted.
    fn contains(&self, bundle: &BundleLocation, relative_path: &str) -> Result<bool, AssetError>;
}

// ============================================================================
// SECTION: Composition Audit
// ============================================================================

/// Composition audit event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionEventKind {
    /// A resource node was appended to the graph.
    ResourceDeclared,
    /// A review finding was recorded.
    ReviewFinding,
    /// A usage plan was declared with explicit unlimited usage.
    UnlimitedUsage,
    /// Composition finished and produced a graph.
    CompositionCompleted,
    /// Composition failed; no graph was emitted.
    CompositionFailed,
}

/// Composition audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct CompositionEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event classification.
    pub kind: CompositionEventKind,
    /// Resource the event refers to, if any.
    pub logical_id: Option<LogicalId>,
    /// Resource kind, if the event refers to a resource.
    pub resource_kind: Option<ResourceKind>,
    /// Human-readable detail.
    pub message: String,
}

impl CompositionEvent {
    /// Creates a new composition event with a consistent timestamp.
    #[must_use]
    pub fn new(
        kind: CompositionEventKind,
        logical_id: Option<LogicalId>,
        resource_kind: Option<ResourceKind>,
        message: impl Into<String>,
    ) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: "composition_event",
            timestamp_ms,
            kind,
            logical_id,
            resource_kind,
            message: message.into(),
        }
    }
}

/// Audit sink for composition events.
pub trait CompositionAuditSink: Send + Sync {
    /// Record a composition event.
    fn record(&self, event: &CompositionEvent);
}
