// SPDX-License-Identifier: MIT

//! Handle on one graph of a running session

use std::collections::BTreeMap;
use std::fmt;

use super::controller::ExecutionController;
use super::scheduler::RunTicket;
use crate::flow::error::{FlowError, Result};
use crate::flow::graph::{NodeFilter, NodeId, NodeSnapshot};

/// The root graph or a nested sub-graph, as seen through its controller
///
/// Returned by [`ExecutionController::find_next_waiting_scope`] so that a
/// resumed value is executed in the graph that actually owns the waiting
/// node.
#[derive(Clone)]
pub struct WorkflowScope<'a> {
    controller: &'a ExecutionController,
    id: NodeId,
}

impl<'a> WorkflowScope<'a> {
    pub(crate) fn new(controller: &'a ExecutionController, id: NodeId) -> Self {
        Self { controller, id }
    }

    /// Id of the graph: the root id or the owning sub-graph node
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }

    pub fn name(&self) -> Option<String> {
        self.controller.graph_name(&self.id)
    }

    /// Waiting interactive nodes owned directly by this graph
    pub fn find_waiting_nodes(&self, filter: NodeFilter) -> Result<BTreeMap<NodeId, NodeSnapshot>> {
        self.controller.find_waiting_nodes_in(&self.id, filter)
    }

    /// Execute `node`, a node of this graph, and whatever it still depends on
    ///
    /// Used to resume at a waiting node once its value has been supplied;
    /// nothing downstream of `node` is scheduled.
    pub fn execute_up_to_here(&self, node: &NodeId) -> Result<RunTicket> {
        if node.parent().as_ref() != Some(&self.id) {
            return Err(FlowError::UnknownNode(node.clone()));
        }
        self.controller.execute(node)
    }
}

impl fmt::Debug for WorkflowScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowScope").field("id", &self.id).finish()
    }
}

impl PartialEq for WorkflowScope<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.controller, other.controller) && self.id == other.id
    }
}
