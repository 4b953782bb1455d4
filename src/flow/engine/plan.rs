// SPDX-License-Identifier: MIT

//! Flattened execution plan over the whole graph arena
//!
//! Scheduling works on effective dependencies:
//! - a child node without declared upstream reads the inputs of its owning
//!   sub-graph node
//! - a sub-graph node depends on its declared upstream and on its children
//!
//! The flattened order lists every child graph right before its owner, so it
//! is a topological order of the effective relation.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::flow::error::Result;
use crate::flow::graph::{GraphArena, NodeId};

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    order: Vec<NodeId>,
    position: HashMap<NodeId, usize>,
    upstream: HashMap<NodeId, Vec<NodeId>>,
    downstream: HashMap<NodeId, Vec<NodeId>>,
}

impl ExecutionPlan {
    pub fn build(arena: &GraphArena) -> Result<Self> {
        arena.validate()?;

        let mut order = Vec::new();
        flatten(arena, arena.root_id(), &mut order)?;

        let mut upstream: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for id in &order {
            let node = arena.node(id)?;
            let mut deps = if node.upstream.is_empty() {
                entry_inputs(arena, &id.parent().unwrap_or_else(NodeId::root))?
            } else {
                node.upstream.clone()
            };
            if arena.is_container(id) {
                deps.extend(arena.graph(id)?.topological_order().iter().cloned());
            }
            upstream.insert(id.clone(), deps);
        }

        let mut downstream: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for id in &order {
            for dep in &upstream[id] {
                downstream.entry(dep.clone()).or_default().push(id.clone());
            }
        }

        let position = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        Ok(Self {
            order,
            position,
            upstream,
            downstream,
        })
    }

    /// Every node of the arena in flattened topological order
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.position.get(id).copied()
    }

    /// Effective upstream, in input order
    pub fn upstream(&self, id: &NodeId) -> &[NodeId] {
        self.upstream
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    pub fn downstream(&self, id: &NodeId) -> &[NodeId] {
        self.downstream
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    /// `id` and everything it effectively depends on
    pub fn ancestors(&self, id: &NodeId) -> HashSet<NodeId> {
        walk(id, |n| self.upstream(n))
    }

    /// `id` and everything that effectively depends on it
    pub fn descendants(&self, id: &NodeId) -> HashSet<NodeId> {
        walk(id, |n| self.downstream(n))
    }
}

fn flatten(arena: &GraphArena, graph_id: &NodeId, order: &mut Vec<NodeId>) -> Result<()> {
    let graph = arena.graph(graph_id)?;
    for id in graph.topological_order() {
        if arena.is_container(id) {
            flatten(arena, id, order)?;
        }
        order.push(id.clone());
    }
    Ok(())
}

/// Inputs seen by entry nodes of `graph_id`
fn entry_inputs(arena: &GraphArena, graph_id: &NodeId) -> Result<Vec<NodeId>> {
    if graph_id == arena.root_id() {
        return Ok(Vec::new());
    }
    let owner = arena.node(graph_id)?;
    if !owner.upstream.is_empty() {
        return Ok(owner.upstream.clone());
    }
    match graph_id.parent() {
        Some(parent) => entry_inputs(arena, &parent),
        None => Ok(Vec::new()),
    }
}

fn walk<'a, F>(start: &NodeId, next: F) -> HashSet<NodeId>
where
    F: Fn(&NodeId) -> &'a [NodeId],
{
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start.clone());
    queue.push_back(start.clone());
    while let Some(current) = queue.pop_front() {
        for n in next(&current) {
            if seen.insert(n.clone()) {
                queue.push_back(n.clone());
            }
        }
    }
    seen
}
