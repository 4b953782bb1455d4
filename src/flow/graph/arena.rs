// SPDX-License-Identifier: MIT

//! Ownership tree of nested graphs
//!
//! Every graph is keyed by the id of the node that owns it; the root graph is
//! keyed by the root id. Finding the graph that owns a node is a lookup of
//! the node's parent id.

use std::collections::HashMap;

use super::graph::Graph;
use super::id::NodeId;
use super::node::{NodeKind, NodeRecord, NodeState};
use crate::flow::error::{FlowError, Result, WorkflowError};

#[derive(Debug, Clone)]
pub struct GraphArena {
    root: NodeId,
    graphs: HashMap<NodeId, Graph>,
}

impl GraphArena {
    pub fn new(root: Graph) -> Self {
        let root_id = root.id().clone();
        let mut graphs = HashMap::new();
        graphs.insert(root_id.clone(), root);
        Self {
            root: root_id,
            graphs,
        }
    }

    /// Attach the child graph of a sub-graph node already in the arena
    pub fn insert(&mut self, graph: Graph) -> Result<()> {
        let owner = self.node(graph.id())?;
        if !matches!(owner.kind, NodeKind::SubGraph) {
            return Err(FlowError::NotAContainer(graph.id().clone()));
        }
        if self.graphs.contains_key(graph.id()) {
            return Err(WorkflowError::DuplicateNode(graph.id().clone()).into());
        }
        self.graphs.insert(graph.id().clone(), graph);
        Ok(())
    }

    /// Check that every sub-graph node has its child graph
    pub fn validate(&self) -> Result<()> {
        for graph in self.graphs.values() {
            for node in graph.nodes() {
                if matches!(node.kind, NodeKind::SubGraph) && !self.graphs.contains_key(&node.id) {
                    return Err(WorkflowError::MissingSection {
                        node: node.id.to_string(),
                        section: "workflow".to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    pub fn root(&self) -> &Graph {
        // the root graph is inserted on construction and never removed
        &self.graphs[&self.root]
    }

    pub fn graph(&self, id: &NodeId) -> Result<&Graph> {
        self.graphs
            .get(id)
            .ok_or_else(|| self.missing_graph(id))
    }

    pub fn graphs(&self) -> impl Iterator<Item = &Graph> {
        self.graphs.values()
    }

    pub fn is_container(&self, id: &NodeId) -> bool {
        self.graphs.contains_key(id)
    }

    /// The graph that owns `id`
    pub fn owner(&self, id: &NodeId) -> Result<&Graph> {
        let parent = id
            .parent()
            .ok_or_else(|| FlowError::UnknownNode(id.clone()))?;
        self.graphs
            .get(&parent)
            .ok_or_else(|| FlowError::UnknownNode(id.clone()))
    }

    pub fn node(&self, id: &NodeId) -> Result<&NodeRecord> {
        self.owner(id)?.node(id)
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Result<&mut NodeRecord> {
        let parent = id
            .parent()
            .ok_or_else(|| FlowError::UnknownNode(id.clone()))?;
        self.graphs
            .get_mut(&parent)
            .ok_or_else(|| FlowError::UnknownNode(id.clone()))?
            .node_mut(id)
    }

    pub fn state(&self, id: &NodeId) -> Result<NodeState> {
        self.node(id).map(|n| n.state)
    }

    /// Nodes of `container` and of every graph nested inside it
    pub fn nodes_within<'a>(&'a self, container: &'a NodeId) -> impl Iterator<Item = &'a NodeRecord> {
        self.graphs
            .values()
            .filter(move |g| g.id().is_within(container))
            .flat_map(|g| g.nodes())
    }

    fn missing_graph(&self, id: &NodeId) -> FlowError {
        if self.node(id).is_ok() {
            FlowError::NotAContainer(id.clone())
        } else {
            FlowError::UnknownNode(id.clone())
        }
    }
}
