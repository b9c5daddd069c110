// crates/gateway-topology-config/src/lib.rs
// ============================================================================
// Module: Gateway Topology Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for gateway-topology.toml semantics.
// Dependencies: gateway-topology-core, serde, toml
// ============================================================================

//! ## Overview
//! `gateway-topology-config` defines the configuration model read by the
//! `gateway-topology` CLI: deployment environment, audit sink, and the full
//! topology declaration. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
