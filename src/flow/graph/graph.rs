// SPDX-License-Identifier: MIT

//! A single workflow graph: node records plus dependency edges

use std::collections::{BTreeSet, HashMap};

use super::id::NodeId;
use super::node::{NodeRecord, NodeState};
use crate::flow::error::{FlowError, Result, WorkflowError};

/// Fixed-topology, mutable-state container of node records
#[derive(Debug, Clone)]
pub struct Graph {
    /// Id of the owning node (the root id for the top-level workflow)
    id: NodeId,
    name: String,
    /// Page layout metadata, kept opaque until a page is requested
    layout: Option<String>,
    /// Records in insertion order
    nodes: Vec<NodeRecord>,
    index: HashMap<NodeId, usize>,
    downstream: HashMap<NodeId, Vec<NodeId>>,
    /// Computed once; topology does not change during a session
    order: Vec<NodeId>,
}

impl Graph {
    /// Create a graph, validating ids, dependencies and acyclicity
    pub fn new(id: NodeId, name: impl Into<String>, nodes: Vec<NodeRecord>) -> Result<Self> {
        let mut index = HashMap::new();
        for (i, node) in nodes.iter().enumerate() {
            if node.id.parent().as_ref() != Some(&id) {
                return Err(FlowError::UnknownNode(node.id.clone()));
            }
            if index.insert(node.id.clone(), i).is_some() {
                return Err(WorkflowError::DuplicateNode(node.id.clone()).into());
            }
        }

        let mut downstream: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in &nodes {
            for dep in &node.upstream {
                if !index.contains_key(dep) {
                    return Err(WorkflowError::UnknownDependency {
                        node: node.id.clone(),
                        dependency: dep.clone(),
                    }
                    .into());
                }
                downstream
                    .entry(dep.clone())
                    .or_default()
                    .push(node.id.clone());
            }
        }

        let order = stable_topological_order(&nodes, &index)?;

        Ok(Self {
            id,
            name: name.into(),
            layout: None,
            nodes,
            index,
            downstream,
            order,
        })
    }

    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Records in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter()
    }

    pub fn node(&self, id: &NodeId) -> Result<&NodeRecord> {
        self.index
            .get(id)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| FlowError::UnknownNode(id.clone()))
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Result<&mut NodeRecord> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.nodes[i]),
            None => Err(FlowError::UnknownNode(id.clone())),
        }
    }

    /// Current state of a node; never blocks
    pub fn state(&self, id: &NodeId) -> Result<NodeState> {
        self.node(id).map(|n| n.state)
    }

    /// Declared upstream nodes, in input order
    pub fn upstream(&self, id: &NodeId) -> Result<&[NodeId]> {
        self.node(id).map(|n| n.upstream.as_slice())
    }

    /// Direct downstream nodes, in insertion order of the consumers
    pub fn downstream(&self, id: &NodeId) -> Result<&[NodeId]> {
        self.node(id)?;
        Ok(self
            .downstream
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or_default())
    }

    /// Classify a node; hidden interactive nodes only count with `include_hidden`
    pub fn is_interactive_input(&self, id: &NodeId, include_hidden: bool) -> Result<bool> {
        let node = self.node(id)?;
        Ok(node.interactive_spec().is_some() && (include_hidden || !node.is_hidden()))
    }

    /// Dependency order, ties broken by insertion order
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Nodes nothing else in this graph depends on, in topological order
    pub fn sinks(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .filter(|id| self.downstream.get(*id).map_or(true, |d| d.is_empty()))
            .cloned()
            .collect()
    }
}

/// Kahn's algorithm, always taking the earliest inserted ready node
fn stable_topological_order(
    nodes: &[NodeRecord],
    index: &HashMap<NodeId, usize>,
) -> Result<Vec<NodeId>> {
    let mut in_degree: Vec<usize> = nodes.iter().map(|n| n.upstream.len()).collect();
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for dep in &node.upstream {
            consumers[index[dep]].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| i)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(next) = ready.pop_first() {
        order.push(nodes[next].id.clone());
        for &consumer in &consumers[next] {
            in_degree[consumer] -= 1;
            if in_degree[consumer] == 0 {
                ready.insert(consumer);
            }
        }
    }

    if order.len() != nodes.len() {
        let cycle: Vec<String> = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, n)| n.id.to_string())
            .collect();
        return Err(WorkflowError::CircularDependency(cycle).into());
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::graph::node::{InteractiveSpec, NodeModel, NodeOutput, ValueType};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::error::Error;
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl NodeModel for Noop {
        fn type_name(&self) -> &str {
            "noop"
        }

        async fn execute(
            &self,
            _inputs: Vec<Value>,
        ) -> std::result::Result<NodeOutput, Box<dyn Error + Send + Sync>> {
            Ok(NodeOutput::new(Value::Null))
        }
    }

    fn id(n: u32) -> NodeId {
        NodeId::root().child(n)
    }

    fn node(n: u32, deps: &[u32]) -> NodeRecord {
        NodeRecord::ordinary(
            id(n),
            format!("node {}", n),
            Arc::new(Noop),
            deps.iter().map(|d| id(*d)).collect(),
        )
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let graph = Graph::new(
            NodeId::root(),
            "g",
            vec![node(3, &[1, 2]), node(1, &[]), node(2, &[1])],
        )
        .unwrap();

        assert_eq!(graph.topological_order(), &[id(1), id(2), id(3)]);
    }

    #[test]
    fn test_topological_order_ties_follow_insertion() {
        let graph = Graph::new(
            NodeId::root(),
            "g",
            vec![node(9, &[]), node(4, &[]), node(7, &[9]), node(5, &[4])],
        )
        .unwrap();

        assert_eq!(graph.topological_order(), &[id(9), id(4), id(7), id(5)]);
        // reproducible
        assert_eq!(graph.topological_order(), graph.clone().topological_order());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let result = Graph::new(
            NodeId::root(),
            "g",
            vec![node(1, &[3]), node(2, &[1]), node(3, &[2]), node(4, &[])],
        );

        match result {
            Err(FlowError::Workflow(WorkflowError::CircularDependency(ids))) => {
                assert_eq!(ids, vec!["0:1", "0:2", "0:3"]);
            }
            other => panic!("expected circular dependency, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_dependency_is_rejected() {
        let result = Graph::new(NodeId::root(), "g", vec![node(1, &[2])]);
        assert!(matches!(
            result,
            Err(FlowError::Workflow(WorkflowError::UnknownDependency { .. }))
        ));
    }

    #[test]
    fn test_duplicate_node_is_rejected() {
        let result = Graph::new(NodeId::root(), "g", vec![node(1, &[]), node(1, &[])]);
        assert!(matches!(
            result,
            Err(FlowError::Workflow(WorkflowError::DuplicateNode(_)))
        ));
    }

    #[test]
    fn test_queries_and_unknown_node() {
        let flag = NodeRecord::interactive(
            id(1),
            "flag",
            InteractiveSpec::new(ValueType::Boolean),
            json!(true),
            vec![],
        );
        let hidden = NodeRecord::interactive(
            id(2),
            "secret",
            InteractiveSpec::new(ValueType::String).hidden(),
            json!(""),
            vec![],
        );
        let graph = Graph::new(NodeId::root(), "g", vec![flag, hidden, node(14, &[1, 2])]).unwrap();

        assert_eq!(graph.state(&id(1)).unwrap(), NodeState::Idle);
        assert_eq!(graph.upstream(&id(14)).unwrap(), &[id(1), id(2)]);
        assert_eq!(graph.downstream(&id(1)).unwrap(), &[id(14)]);
        assert!(graph.is_interactive_input(&id(1), false).unwrap());
        assert!(!graph.is_interactive_input(&id(2), false).unwrap());
        assert!(graph.is_interactive_input(&id(2), true).unwrap());
        assert!(!graph.is_interactive_input(&id(14), true).unwrap());
        assert_eq!(graph.sinks(), vec![id(14)]);

        assert!(matches!(graph.state(&id(99)), Err(FlowError::UnknownNode(_))));
        assert!(matches!(graph.upstream(&id(99)), Err(FlowError::UnknownNode(_))));
    }
}
