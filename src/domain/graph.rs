//! Dependency graph for items
//!
//! Edges point from a dependency to its dependent and carry the lag in minutes.
//! Uses petgraph for graph operations.
//!
//! Graphs loaded from stored items are built leniently: unknown references are
//! skipped and cycles are kept, because propagation must survive them. Edges
//! added through [`DependencyGraph::add_dependency`] are checked and an edge
//! that would close a cycle is refused.

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use thiserror::Error;

use super::id::ItemId;
use super::item::Item;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("Adding dependency would create a cycle: {0} -> {1}")]
    CycleDetected(ItemId, ItemId),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Self-dependency not allowed: {0}")]
    SelfDependency(ItemId),

    #[error("Dependency graph contains a cycle through item {0}")]
    Cyclic(ItemId),
}

/// A dependency graph for items
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph, edge weight is the lag
    graph: DiGraph<ItemId, u32>,

    /// Map from ItemId to node index
    node_map: HashMap<ItemId, NodeIndex>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds a graph from a collection of items, keeping whatever edges exist
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut graph = Self::new();

        // First pass: add all nodes
        let items: Vec<_> = items.into_iter().collect();
        for item in &items {
            graph.add_item(item.id);
        }

        // Second pass: add all edges that resolve
        for item in &items {
            for dep in &item.dependencies {
                if dep.item == item.id {
                    continue;
                }
                if let (Some(&from), Some(&to)) =
                    (graph.node_map.get(&dep.item), graph.node_map.get(&item.id))
                {
                    graph.graph.update_edge(from, to, dep.lag);
                }
            }
        }

        graph
    }

    /// Adds an item to the graph
    pub fn add_item(&mut self, item_id: ItemId) {
        if !self.node_map.contains_key(&item_id) {
            let idx = self.graph.add_node(item_id);
            self.node_map.insert(item_id, idx);
        }
    }

    /// Adds a dependency edge: `item` depends on `depends_on` with `lag`
    ///
    /// The edge direction is: depends_on -> item. It closes a cycle exactly
    /// when `item` already reaches `depends_on`; cycles elsewhere in the
    /// graph do not matter.
    pub fn add_dependency(
        &mut self,
        item: ItemId,
        depends_on: ItemId,
        lag: u32,
    ) -> Result<(), GraphError> {
        if item == depends_on {
            return Err(GraphError::SelfDependency(item));
        }

        let item_idx = *self
            .node_map
            .get(&item)
            .ok_or(GraphError::ItemNotFound(item))?;

        let dep_idx = *self
            .node_map
            .get(&depends_on)
            .ok_or(GraphError::ItemNotFound(depends_on))?;

        let existed = self.graph.find_edge(dep_idx, item_idx).is_some();
        if !existed && has_path_connecting(&self.graph, item_idx, dep_idx, None) {
            return Err(GraphError::CycleDetected(item, depends_on));
        }

        self.graph.update_edge(dep_idx, item_idx, lag);
        Ok(())
    }

    /// Returns the direct dependents of an item with the edge lag, sorted by ID
    pub fn dependents(&self, item_id: ItemId) -> Vec<(ItemId, u32)> {
        let Some(&idx) = self.node_map.get(&item_id) else {
            return vec![];
        };

        let mut out: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter_map(|edge| {
                self.graph
                    .node_weight(edge.target())
                    .map(|id| (*id, *edge.weight()))
            })
            .collect();
        out.sort();
        out
    }

    /// Returns an error naming an item on a cycle, if any
    pub fn check_acyclic(&self) -> Result<(), GraphError> {
        toposort(&self.graph, None)
            .map(|_| ())
            .map_err(|cycle| GraphError::Cyclic(self.graph[cycle.node_id()]))
    }
}
