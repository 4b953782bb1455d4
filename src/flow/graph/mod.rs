// SPDX-License-Identifier: MIT

//! Node records, graphs and the nested-graph arena
//!
//! Topology is fixed once a graph is built; only node state changes while a
//! session runs.

mod arena;
#[allow(clippy::module_inception)]
mod graph;
mod id;
mod node;

pub use arena::GraphArena;
pub use graph::Graph;
pub use id::{NodeId, NodeIdSuffix, ParseNodeIdError};
pub use node::{
    InteractiveSpec, NodeClass, NodeFilter, NodeKind, NodeModel, NodeOutput, NodeRecord,
    NodeSnapshot, NodeState, ValueType,
};
