// crates/gateway-topology-core/src/core/mod.rs
// ============================================================================
// Module: Gateway Topology Core Types
// Description: Resource models, graph, and deterministic hashing.
// Purpose: Group the pure data model shared by the builder and simulator.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain data with validating constructors. Nothing in this
//! module performs I/O; asset lookups and audit output go through
//! [`crate::interfaces`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod access;
pub mod compute;
pub mod deployment;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod grant;
pub mod graph;
pub mod hashing;
pub mod identifiers;
pub mod identity;
pub mod manifest;
pub mod package;
pub mod review;
pub mod routing;
pub mod spec;
pub mod wildcard;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::MIN_KEY_VALUE_LENGTH;
pub use access::ApiKey;
pub use access::Throttle;
pub use access::QuotaPeriod;
pub use access::Quota;
pub use access::UsageLimits;
pub use access::AccessPlan;
pub use compute::EntryPoint;
pub use compute::ComputeUnitParams;
pub use compute::ComputeUnit;
pub use deployment::Deployment;
pub use deployment::LogLevel;
pub use deployment::LoggingPosture;
pub use deployment::StageRole;
pub use deployment::StageState;
pub use deployment::Stage;
pub use environment::DEFAULT_PARTITION;
pub use environment::DeploymentEnvironment;
pub use error::TopologyError;
pub use gateway::API_KEY_HEADER;
pub use gateway::DEFAULT_CORS_HEADERS;
pub use gateway::ALL_CORS_METHODS;
pub use gateway::EndpointVisibility;
pub use gateway::ApiKeySource;
pub use gateway::CorsPolicy;
pub use gateway::HttpGateway;
pub use grant::GATEWAY_SERVICE_PRINCIPAL;
pub use grant::INVOKE_ACTION;
pub use grant::TEST_INVOKE_STAGE;
pub use grant::ScopeArn;
pub use grant::GrantOrigin;
pub use grant::InvocationGrant;
pub use graph::ROOT_SCOPE;
pub use graph::ResourceKind;
pub use graph::ResourceNode;
pub use graph::ResourceGraph;
pub use hashing::HashAlgorithm;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::hash_bytes;
pub use hashing::hash_parts;
pub use identifiers::DeploymentId;
pub use identifiers::GatewayId;
pub use identifiers::GrantId;
pub use identifiers::IdentityId;
pub use identifiers::KeyId;
pub use identifiers::LogicalId;
pub use identifiers::PackageId;
pub use identifiers::PlanId;
pub use identifiers::RouteId;
pub use identifiers::StageId;
pub use identifiers::UnitId;
pub use identity::COMPUTE_SERVICE_PRINCIPAL;
pub use identity::LOG_WRITE_ACTIONS;
pub use identity::DEFAULT_POLICY_NAME;
pub use identity::StatementEffect;
pub use identity::PermissionStatement;
pub use identity::IdentityDescriptor;
pub use manifest::MANIFEST_FORMAT_VERSION;
pub use manifest::StackOutput;
pub use manifest::ManifestBody;
pub use manifest::TopologyManifest;
pub use package::RuntimeFamily;
pub use package::RuntimeVersion;
pub use package::BundleLocation;
pub use package::RuntimePackageReference;
pub use review::FindingKind;
pub use review::ReviewFinding;
pub use routing::HttpMethod;
pub use routing::PathSegment;
pub use routing::PathPattern;
pub use routing::RequestPath;
pub use routing::PathCaptures;
pub use routing::Route;
pub use routing::RouteMatch;
pub use routing::RouteTable;
pub use spec::DEFAULT_NESTED_UNIT_NAME;
pub use spec::DOCS_ROUTES;
pub use spec::IsolationMode;
pub use spec::IdentitySpec;
pub use spec::PackageSpec;
pub use spec::FunctionSpec;
pub use spec::RouteSpec;
pub use spec::GatewaySpec;
pub use spec::PrimaryStageSpec;
pub use spec::StageGrantSpec;
pub use spec::StageSpec;
pub use spec::ApiKeySpec;
pub use spec::AccessPlanSpec;
pub use spec::TopologySpec;
pub use wildcard::wildcard_match;
