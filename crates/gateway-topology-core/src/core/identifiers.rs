// crates/gateway-topology-core/src/core/identifiers.rs
// ============================================================================
// Module: Gateway Topology Identifiers
// Description: Canonical opaque identifiers for topology resources.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every resource declared into a topology is addressed by a logical
//! identifier. The typed wrappers below keep handles for different resource
//! kinds apart at compile time while all serializing as plain strings.
//! Logical identifiers are derived from resource names so a rendered graph
//! stays readable and stable across rebuilds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a string-backed identifier with the shared constructor surface.
macro_rules! logical_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from a raw string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the graph-level logical identifier for this handle.
            #[must_use]
            pub fn as_logical(&self) -> LogicalId {
                LogicalId::new(self.0.clone())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

logical_identifier!(
    /// Graph-level identifier shared by every declared resource.
    LogicalId
);

logical_identifier!(
    /// Identity descriptor (execution role) handle.
    IdentityId
);

logical_identifier!(
    /// Runtime package reference (layer) handle.
    PackageId
);

logical_identifier!(
    /// Compute unit (function) handle.
    UnitId
);

logical_identifier!(
    /// HTTP gateway handle.
    GatewayId
);

logical_identifier!(
    /// Gateway route (method) handle.
    RouteId
);

logical_identifier!(
    /// Gateway deployment snapshot handle.
    DeploymentId
);

logical_identifier!(
    /// Gateway stage handle.
    StageId
);

logical_identifier!(
    /// Consumer API key handle.
    KeyId
);

logical_identifier!(
    /// Access (usage) plan handle.
    PlanId
);

logical_identifier!(
    /// Invocation grant handle.
    GrantId
);

// ============================================================================
// SECTION: Derivation Helpers
// ============================================================================

impl IdentityId {
    /// Derives the identity handle for a role name.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        Self::new(format!("identity/{name}"))
    }
}

impl PackageId {
    /// Derives the package handle for a layer name.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        Self::new(format!("package/{name}"))
    }
}

impl UnitId {
    /// Derives the compute unit handle for a function name.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        Self::new(format!("unit/{name}"))
    }
}

impl GatewayId {
    /// Derives the gateway handle for a gateway name.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        Self::new(format!("gateway/{name}"))
    }

    /// Returns the gateway name portion of the handle.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.strip_prefix("gateway/").unwrap_or(&self.0)
    }
}

impl RouteId {
    /// Derives the route handle for a method and pattern on a gateway.
    #[must_use]
    pub fn for_route(gateway: &GatewayId, method: &str, pattern: &str) -> Self {
        Self::new(format!("route/{}/{method} {pattern}", gateway.name()))
    }
}

impl DeploymentId {
    /// Derives the handle of the `ordinal`-th deployment of a gateway.
    #[must_use]
    pub fn for_ordinal(gateway: &GatewayId, ordinal: usize) -> Self {
        Self::new(format!("deployment/{}/{ordinal}", gateway.name()))
    }
}

impl StageId {
    /// Derives the stage handle for a stage name on a gateway.
    #[must_use]
    pub fn for_stage(gateway: &GatewayId, name: &str) -> Self {
        Self::new(format!("stage/{}/{name}", gateway.name()))
    }
}

impl KeyId {
    /// Derives the key handle for an API key name.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        Self::new(format!("key/{name}"))
    }
}

impl PlanId {
    /// Derives the plan handle for a usage plan name.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        Self::new(format!("plan/{name}"))
    }
}
