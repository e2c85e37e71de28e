// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::{GraphNode, NodeId};
use crate::core::{Result, StreamError};

/// Directed acyclic graph of stream nodes.
///
/// Edges run from upstream to downstream. Each edge is backed at run time by
/// the downstream node's single inbound queue.
#[derive(Debug, Default)]
pub struct StreamGraph {
    digraph: DiGraph<GraphNode, ()>,
    index: HashMap<NodeId, NodeIndex>,
}

impl StreamGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Add a node and its upstream edges. Leaves the graph untouched on error.
    pub(crate) fn insert(&mut self, node: GraphNode) -> Result<()> {
        if self.index.contains_key(node.id()) {
            return Err(StreamError::DuplicateNodeId(node.id().to_string()));
        }
        let mut upstream_indices = Vec::with_capacity(node.upstreams().len());
        for upstream in node.upstreams() {
            match self.index.get(upstream) {
                Some(idx) => upstream_indices.push(*idx),
                None => {
                    return Err(StreamError::UnknownUpstream {
                        node: node.id().to_string(),
                        upstream: upstream.to_string(),
                    })
                }
            }
        }

        let id = node.id().clone();
        let idx = self.digraph.add_node(node);
        for upstream_idx in upstream_indices {
            self.digraph.add_edge(upstream_idx, idx, ());
        }
        self.index.insert(id, idx);
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|idx| &self.digraph[*idx])
    }

    pub fn node_count(&self) -> usize {
        self.digraph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.digraph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.digraph.node_count() == 0
    }

    /// Nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.digraph.node_weights()
    }

    /// Ids of nodes fed by `id`, in registration order.
    pub fn downstreams(&self, id: &str) -> Vec<&NodeId> {
        let Some(idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<NodeIndex> = self
            .digraph
            .neighbors_directed(*idx, Direction::Outgoing)
            .collect();
        children.sort();
        children.dedup();
        children
            .into_iter()
            .map(|child| self.digraph[child].id())
            .collect()
    }

    /// Node ids ordered so that every upstream precedes its downstreams.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let order = toposort(&self.digraph, None).map_err(|cycle| {
            StreamError::CyclicGraph(self.digraph[cycle.node_id()].id().to_string())
        })?;
        Ok(order
            .into_iter()
            .map(|idx| self.digraph[idx].id().clone())
            .collect())
    }

    /// Consume the graph, yielding its nodes in topological order.
    pub(crate) fn into_sorted_nodes(self) -> Result<Vec<GraphNode>> {
        let order = toposort(&self.digraph, None).map_err(|cycle| {
            StreamError::CyclicGraph(self.digraph[cycle.node_id()].id().to_string())
        })?;
        let (nodes, _) = self.digraph.into_nodes_edges();
        let mut slots: Vec<Option<GraphNode>> = nodes.into_iter().map(|n| Some(n.weight)).collect();
        Ok(order
            .into_iter()
            .filter_map(|idx| slots[idx.index()].take())
            .collect())
    }
}
