// crates/gateway-topology-core/src/runtime/topology.rs
// ============================================================================
// Module: Composed Topology
// Description: Read-only result of a successful composition pass.
// Purpose: Expose the graph, manifest, and typed resources to callers.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A [`Topology`] only exists when composition succeeded; failures never
//! produce one. It keeps the typed resources next to the rendered manifest
//! so the invoke simulator can evaluate requests against the same state the
//! provisioning collaborator would receive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::access::AccessPlan;
use crate::core::access::ApiKey;
use crate::core::compute::ComputeUnit;
use crate::core::deployment::Deployment;
use crate::core::deployment::Stage;
use crate::core::environment::DeploymentEnvironment;
use crate::core::gateway::HttpGateway;
use crate::core::grant::InvocationGrant;
use crate::core::graph::ResourceGraph;
use crate::core::identifiers::DeploymentId;
use crate::core::identifiers::GatewayId;
use crate::core::identifiers::IdentityId;
use crate::core::identifiers::KeyId;
use crate::core::identifiers::PackageId;
use crate::core::identifiers::StageId;
use crate::core::identifiers::UnitId;
use crate::core::identity::IdentityDescriptor;
use crate::core::manifest::TopologyManifest;
use crate::core::package::RuntimePackageReference;
use crate::core::spec::IsolationMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Name of the base URL output.
pub const URL_OUTPUT: &str = "URL";

// ============================================================================
// SECTION: Gateway Record
// ============================================================================

/// A gateway together with its deployments and stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRecord {
    /// Gateway with its live route table.
    pub gateway: HttpGateway,
    /// Deployments in creation order.
    pub(crate) deployments: Vec<Deployment>,
    /// Stages in declaration order, bound or not.
    pub(crate) stages: Vec<Stage>,
    /// Primary stage, once created.
    pub(crate) primary_stage: Option<StageId>,
}

impl GatewayRecord {
    /// Creates a record for a freshly created gateway.
    pub(crate) const fn new(gateway: HttpGateway) -> Self {
        Self {
            gateway,
            deployments: Vec::new(),
            stages: Vec::new(),
            primary_stage: None,
        }
    }

    /// Returns deployments in creation order.
    #[must_use]
    pub fn deployments(&self) -> &[Deployment] {
        &self.deployments
    }

    /// Returns a deployment by id.
    #[must_use]
    pub fn deployment(&self, id: &DeploymentId) -> Option<&Deployment> {
        self.deployments.iter().find(|deployment| deployment.id() == id)
    }

    /// Returns stages in declaration order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns a stage by id.
    #[must_use]
    pub fn stage(&self, id: &StageId) -> Option<&Stage> {
        self.stages.iter().find(|stage| &stage.id == id)
    }

    /// Returns a stage by name.
    #[must_use]
    pub fn stage_named(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    /// Returns the primary stage, if created.
    #[must_use]
    pub fn primary_stage(&self) -> Option<&Stage> {
        self.primary_stage.as_ref().and_then(|id| self.stage(id))
    }
}

// ============================================================================
// SECTION: Topology
// ============================================================================

/// Successfully composed topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Account/region context.
    pub(crate) environment: DeploymentEnvironment,
    /// Placement mode.
    pub(crate) isolation: IsolationMode,
    /// Resource graph.
    pub(crate) graph: ResourceGraph,
    /// Rendered manifest.
    pub(crate) manifest: TopologyManifest,
    /// Identities by handle.
    pub(crate) identities: BTreeMap<IdentityId, IdentityDescriptor>,
    /// Packages by handle.
    pub(crate) packages: BTreeMap<PackageId, RuntimePackageReference>,
    /// Compute units by handle.
    pub(crate) units: BTreeMap<UnitId, ComputeUnit>,
    /// Gateways in declaration order.
    pub(crate) gateways: Vec<GatewayRecord>,
    /// Keys in declaration order.
    pub(crate) keys: Vec<ApiKey>,
    /// Plans in declaration order.
    pub(crate) plans: Vec<AccessPlan>,
    /// Grants in declaration order.
    pub(crate) grants: Vec<InvocationGrant>,
}

impl Topology {
    /// Returns the account/region context.
    #[must_use]
    pub const fn environment(&self) -> &DeploymentEnvironment {
        &self.environment
    }

    /// Returns the placement mode.
    #[must_use]
    pub const fn isolation(&self) -> IsolationMode {
        self.isolation
    }

    /// Returns the resource graph.
    #[must_use]
    pub const fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Returns the rendered manifest.
    #[must_use]
    pub const fn manifest(&self) -> &TopologyManifest {
        &self.manifest
    }

    /// Returns an identity by handle.
    #[must_use]
    pub fn identity(&self, id: &IdentityId) -> Option<&IdentityDescriptor> {
        self.identities.get(id)
    }

    /// Returns a package by handle.
    #[must_use]
    pub fn package(&self, id: &PackageId) -> Option<&RuntimePackageReference> {
        self.packages.get(id)
    }

    /// Returns a compute unit by handle.
    #[must_use]
    pub fn unit(&self, id: &UnitId) -> Option<&ComputeUnit> {
        self.units.get(id)
    }

    /// Returns gateways in declaration order.
    #[must_use]
    pub fn gateways(&self) -> &[GatewayRecord] {
        &self.gateways
    }

    /// Returns a gateway by handle.
    #[must_use]
    pub fn gateway(&self, id: &GatewayId) -> Option<&GatewayRecord> {
        self.gateways.iter().find(|record| &record.gateway.id == id)
    }

    /// Returns the first declared gateway.
    #[must_use]
    pub fn primary_gateway(&self) -> Option<&GatewayRecord> {
        self.gateways.first()
    }

    /// Returns keys in declaration order.
    #[must_use]
    pub fn keys(&self) -> &[ApiKey] {
        &self.keys
    }

    /// Returns a key by handle.
    #[must_use]
    pub fn key(&self, id: &KeyId) -> Option<&ApiKey> {
        self.keys.iter().find(|key| &key.id == id)
    }

    /// Returns a key by name.
    #[must_use]
    pub fn key_named(&self, name: &str) -> Option<&ApiKey> {
        self.keys.iter().find(|key| key.name == name)
    }

    /// Returns plans in declaration order.
    #[must_use]
    pub fn plans(&self) -> &[AccessPlan] {
        &self.plans
    }

    /// Returns grants in declaration order.
    #[must_use]
    pub fn grants(&self) -> &[InvocationGrant] {
        &self.grants
    }

    /// Returns the public base URL output, if exposed.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.manifest.output(URL_OUTPUT).map(|output| output.value.as_str())
    }
}
