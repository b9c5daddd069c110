// crates/gateway-topology-core/src/runtime/mod.rs
// ============================================================================
// Module: Gateway Topology Runtime
// Description: Builder, composition, simulator, and reference adapters.
// Purpose: Turn declarations into a composed topology and evaluate requests.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime drives one composition pass through [`TopologyBuilder`] or the
//! declarative [`compose`] entry point, and evaluates requests against the
//! result with [`Simulator`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod assets;
pub mod audit;
pub mod builder;
pub mod composition;
pub mod simulator;
pub mod topology;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assets::DeclaredAssetInventory;
pub use assets::FsAssetInventory;
pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use builder::TopologyBuilder;
pub use composition::compose;
pub use simulator::InvocationOutcome;
pub use simulator::InvocationRequest;
pub use simulator::Simulator;
pub use topology::GatewayRecord;
pub use topology::Topology;
pub use topology::URL_OUTPUT;
