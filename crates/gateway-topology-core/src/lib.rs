// crates/gateway-topology-core/src/lib.rs
// ============================================================================
// Module: Gateway Topology Core Library
// Description: Serverless HTTP gateway topology model and composition.
// Purpose: Declare, validate, and simulate a gateway-fronted compute topology.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Gateway Topology Core models a compute unit exposed through an HTTP
//! gateway: execution identity, runtime packages, routes, deployments and
//! stages, consumer keys with access plans, and the invocation grants that let
//! the gateway call the unit. Composition produces a dependency-ordered,
//! fingerprinted manifest for a provisioning collaborator.
//! Invariants:
//! - The resource graph is acyclic by construction.
//! - Deployments are immutable snapshots of a route table.
//! - Additional stages receive no implicit invocation grants.
//!
//! Security posture: broad permission scopes and unlimited plans are kept as
//! declared and surfaced as review findings.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::AssetError;
pub use interfaces::AssetInventory;
pub use interfaces::CompositionAuditSink;
pub use interfaces::CompositionEvent;
pub use interfaces::CompositionEventKind;
pub use runtime::DeclaredAssetInventory;
pub use runtime::FileAuditSink;
pub use runtime::FsAssetInventory;
pub use runtime::GatewayRecord;
pub use runtime::InvocationOutcome;
pub use runtime::InvocationRequest;
pub use runtime::MemoryAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::Simulator;
pub use runtime::StderrAuditSink;
pub use runtime::Topology;
pub use runtime::TopologyBuilder;
pub use runtime::URL_OUTPUT;
pub use runtime::compose;
