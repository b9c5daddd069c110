// crates/gateway-topology-core/src/core/graph.rs
// ============================================================================
// Module: Resource Graph
// Description: Append-only dependency graph of declared resources.
// Purpose: Guarantee a DAG by construction and derive the build order.
// Dependencies: crate::core::{error, identifiers}, serde, serde_json
// ============================================================================

//! ## Overview
//! Nodes are appended in declaration order and may only depend on nodes that
//! were appended before them. A dependency on an undeclared node (including a
//! later one) or on the node itself is a back-reference and is rejected as a
//! cycle. Graphs rebuilt from serialized form are re-checked with Kahn's
//! algorithm because their node order is not trusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::error::TopologyError;
use crate::core::identifiers::LogicalId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Scope label of resources declared directly in the root composition.
pub const ROOT_SCOPE: &str = "root";

// ============================================================================
// SECTION: Resource Kinds
// ============================================================================

/// Classification of graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Execution identity.
    Identity,
    /// Runtime package reference.
    Package,
    /// Compute unit.
    ComputeUnit,
    /// HTTP gateway.
    Gateway,
    /// Gateway route.
    Route,
    /// Deployment snapshot.
    Deployment,
    /// Gateway stage.
    Stage,
    /// Consumer API key.
    ApiKey,
    /// Access plan.
    AccessPlan,
    /// Key bound to a plan.
    PlanKeyBinding,
    /// Stage bound to a plan.
    PlanStageBinding,
    /// Invocation grant.
    InvocationGrant,
    /// Nested deployment unit wrapping a child scope.
    NestedUnit,
    /// Composition output.
    Output,
}

impl ResourceKind {
    /// Returns the stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Package => "package",
            Self::ComputeUnit => "compute_unit",
            Self::Gateway => "gateway",
            Self::Route => "route",
            Self::Deployment => "deployment",
            Self::Stage => "stage",
            Self::ApiKey => "api_key",
            Self::AccessPlan => "access_plan",
            Self::PlanKeyBinding => "plan_key_binding",
            Self::PlanStageBinding => "plan_stage_binding",
            Self::InvocationGrant => "invocation_grant",
            Self::NestedUnit => "nested_unit",
            Self::Output => "output",
        }
    }
}

// ============================================================================
// SECTION: Nodes
// ============================================================================

/// One declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Graph-unique logical identifier.
    pub id: LogicalId,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Deployment scope (`root` or a nested unit name).
    pub scope: String,
    /// Resources that must exist first, without duplicates.
    pub depends_on: Vec<LogicalId>,
    /// Resource properties as rendered into the manifest.
    pub properties: Value,
}

impl ResourceNode {
    /// Creates a node in the root scope.
    #[must_use]
    pub fn new(id: LogicalId, kind: ResourceKind, depends_on: Vec<LogicalId>, properties: Value) -> Self {
        Self {
            id,
            kind,
            scope: ROOT_SCOPE.to_string(),
            depends_on,
            properties,
        }
    }

    /// Moves the node into a named scope.
    #[must_use]
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

// ============================================================================
// SECTION: Graph
// ============================================================================

/// Append-only resource graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ResourceNode>", into = "Vec<ResourceNode>")]
pub struct ResourceGraph {
    /// Nodes in declaration order.
    nodes: Vec<ResourceNode>,
    /// Logical id to node index.
    index: BTreeMap<LogicalId, usize>,
}

impl ResourceGraph {
    /// Creates an empty graph.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Appends a node whose dependencies are all already declared.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] on a duplicate logical id and
    /// [`TopologyError::CyclicDependency`] when a dependency is the node
    /// itself or has not been declared yet.
    pub fn add(&mut self, mut node: ResourceNode) -> Result<(), TopologyError> {
        if self.index.contains_key(&node.id) {
            return Err(TopologyError::Configuration(format!(
                "resource {} is declared more than once",
                node.id
            )));
        }
        let mut seen = BTreeSet::new();
        node.depends_on.retain(|dep| seen.insert(dep.clone()));
        for dep in &node.depends_on {
            if dep == &node.id {
                return Err(TopologyError::CyclicDependency(format!(
                    "resource {} depends on itself",
                    node.id
                )));
            }
            if !self.index.contains_key(dep) {
                return Err(TopologyError::CyclicDependency(format!(
                    "resource {} depends on {dep}, which is not declared before it",
                    node.id
                )));
            }
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Rebuilds a graph from nodes in arbitrary order, rejecting cycles.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] on duplicate ids or unknown
    /// dependencies and [`TopologyError::CyclicDependency`] on cycles.
    pub fn from_nodes(nodes: Vec<ResourceNode>) -> Result<Self, TopologyError> {
        let mut index = BTreeMap::new();
        for (position, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), position).is_some() {
                return Err(TopologyError::Configuration(format!(
                    "resource {} is declared more than once",
                    node.id
                )));
            }
        }
        let graph = Self {
            nodes,
            index,
        };
        graph.build_order()?;
        Ok(graph)
    }

    /// Returns nodes in declaration order.
    #[must_use]
    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    /// Returns a node by logical id.
    #[must_use]
    pub fn get(&self, id: &LogicalId) -> Option<&ResourceNode> {
        self.index.get(id).and_then(|position| self.nodes.get(*position))
    }

    /// Returns true when `id` is declared.
    #[must_use]
    pub fn contains(&self, id: &LogicalId) -> bool {
        self.index.contains_key(id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns nodes of one kind in declaration order.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter().filter(move |node| node.kind == kind)
    }

    /// Computes a build order with Kahn's algorithm.
    ///
    /// Ties break on declaration order, so a graph built through [`Self::add`]
    /// yields its declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] for unknown dependencies and
    /// [`TopologyError::CyclicDependency`] when no order exists.
    pub fn build_order(&self) -> Result<Vec<&LogicalId>, TopologyError> {
        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (position, node) in self.nodes.iter().enumerate() {
            for dep in &node.depends_on {
                let Some(&dep_position) = self.index.get(dep) else {
                    return Err(TopologyError::Configuration(format!(
                        "resource {} depends on unknown resource {dep}",
                        node.id
                    )));
                };
                if let Some(slot) = dependents.get_mut(dep_position) {
                    slot.push(position);
                }
                if let Some(degree) = in_degree.get_mut(position) {
                    *degree += 1;
                }
            }
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(position, _)| position)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(position) = ready.pop_first() {
            let Some(node) = self.nodes.get(position) else {
                continue;
            };
            order.push(&node.id);
            for dependent in dependents.get(position).map(Vec::as_slice).unwrap_or_default() {
                if let Some(degree) = in_degree.get_mut(*dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .enumerate()
                .filter(|(_, degree)| **degree > 0)
                .filter_map(|(position, _)| self.nodes.get(position).map(|node| node.id.as_str()))
                .collect();
            return Err(TopologyError::CyclicDependency(format!(
                "dependency cycle among: {}",
                stuck.join(", ")
            )));
        }
        Ok(order)
    }
}

impl TryFrom<Vec<ResourceNode>> for ResourceGraph {
    type Error = TopologyError;

    fn try_from(nodes: Vec<ResourceNode>) -> Result<Self, Self::Error> {
        Self::from_nodes(nodes)
    }
}

impl From<ResourceGraph> for Vec<ResourceNode> {
    fn from(graph: ResourceGraph) -> Self {
        graph.nodes
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic_in_result_fn,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test assertions may panic inside Result-returning tests."
    )]

    use super::*;

    fn node(id: &str, deps: &[&str]) -> ResourceNode {
        ResourceNode::new(
            LogicalId::new(id),
            ResourceKind::Identity,
            deps.iter().map(|dep| LogicalId::new(*dep)).collect(),
            Value::Null,
        )
    }

    #[test]
    fn add_rejects_forward_and_self_references() -> Result<(), TopologyError> {
        let mut graph = ResourceGraph::new();
        graph.add(node("a", &[]))?;
        assert!(matches!(graph.add(node("b", &["c"])), Err(TopologyError::CyclicDependency(_))));
        assert!(matches!(graph.add(node("b", &["b"])), Err(TopologyError::CyclicDependency(_))));
        assert!(matches!(graph.add(node("a", &[])), Err(TopologyError::Configuration(_))));
        Ok(())
    }

    #[test]
    fn from_nodes_detects_cycles() {
        let result = ResourceGraph::from_nodes(vec![node("a", &["b"]), node("b", &["a"])]);
        assert!(matches!(result, Err(TopologyError::CyclicDependency(_))));
    }

    #[test]
    fn from_nodes_orders_out_of_order_input() -> Result<(), TopologyError> {
        let graph = ResourceGraph::from_nodes(vec![node("b", &["a"]), node("a", &[])])?;
        let order: Vec<&str> = graph.build_order()?.into_iter().map(LogicalId::as_str).collect();
        assert_eq!(order, vec!["a", "b"]);
        Ok(())
    }
}
