// SPDX-License-Identifier: MIT

//! Node records and their classification

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use super::id::NodeId;

/// Execution state of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    /// Not all upstream nodes are executed
    Idle,
    /// Ready to run: every upstream node is executed
    Configured,
    Executing,
    Executed,
    ExecutedWithWarning,
    Failed,
}

impl NodeState {
    /// Executed, with or without warning
    pub fn is_executed(self) -> bool {
        matches!(self, NodeState::Executed | NodeState::ExecutedWithWarning)
    }

    /// Terminal for the current run
    pub fn is_finished(self) -> bool {
        self.is_executed() || self == NodeState::Failed
    }

    /// Waiting to be scheduled (IDLE or CONFIGURED)
    pub fn is_pending(self) -> bool {
        matches!(self, NodeState::Idle | NodeState::Configured)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeState::Idle => "IDLE",
            NodeState::Configured => "CONFIGURED",
            NodeState::Executing => "EXECUTING",
            NodeState::Executed => "EXECUTED",
            NodeState::ExecutedWithWarning => "EXECUTED_WITH_WARNING",
            NodeState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Type of value an interactive input node accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Integer,
    Double,
    String,
    /// Any JSON value
    #[default]
    Json,
}

impl ValueType {
    /// Check if a value is attachable to a slot of this type
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ValueType::Boolean => value.is_boolean(),
            ValueType::Integer => value.is_i64() || value.is_u64(),
            ValueType::Double => value.is_number(),
            ValueType::String => value.is_string(),
            ValueType::Json => true,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::Json => "json",
        };
        f.write_str(name)
    }
}

/// Capabilities of an interactive input node, fixed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveSpec {
    pub value_type: ValueType,
    /// Hidden nodes are skipped by the stepwise protocol
    #[serde(default)]
    pub hidden: bool,
    /// Presentation data handed to the page presenter untouched
    #[serde(default)]
    pub representation: Value,
    /// Script/stylesheet references the presenter may need
    #[serde(default)]
    pub resource_refs: Vec<String>,
}

impl InteractiveSpec {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            hidden: false,
            representation: Value::Null,
            resource_refs: Vec::new(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_representation(mut self, representation: Value) -> Self {
        self.representation = representation;
        self
    }

    pub fn with_resources(mut self, resources: Vec<String>) -> Self {
        self.resource_refs = resources;
        self
    }
}

/// Result of a successful node execution
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput {
    pub value: Value,
    pub warning: Option<String>,
}

impl NodeOutput {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn with_warning(value: Value, warning: impl Into<String>) -> Self {
        Self {
            value,
            warning: Some(warning.into()),
        }
    }
}

/// The computation behind an ordinary node
#[async_trait]
pub trait NodeModel: Send + Sync {
    /// Short type name used in logs and snapshots
    fn type_name(&self) -> &str;

    /// Compute the node's output from its upstream outputs, in declared order
    async fn execute(&self, inputs: Vec<Value>) -> Result<NodeOutput, Box<dyn Error + Send + Sync>>;
}

/// What a node is
#[derive(Clone)]
pub enum NodeKind {
    Ordinary(Arc<dyn NodeModel>),
    /// Needs an externally supplied value; `value` starts as the default
    InteractiveInput { spec: InteractiveSpec, value: Value },
    /// Owns the child graph keyed by this node's id
    SubGraph,
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Ordinary(model) => write!(f, "Ordinary({})", model.type_name()),
            NodeKind::InteractiveInput { spec, value } => f
                .debug_struct("InteractiveInput")
                .field("spec", spec)
                .field("value", value)
                .finish(),
            NodeKind::SubGraph => f.write_str("SubGraph"),
        }
    }
}

/// Closed set of node classes the stepwise protocol can filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    Ordinary,
    InteractiveInput,
    SubGraph,
}

/// Node classifier: a class plus the hidden-node policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeFilter {
    pub class: NodeClass,
    pub include_hidden: bool,
}

impl NodeFilter {
    /// Visible interactive input nodes, the policy the wizard uses
    pub fn interactive() -> Self {
        Self {
            class: NodeClass::InteractiveInput,
            include_hidden: false,
        }
    }

    pub fn interactive_with_hidden() -> Self {
        Self {
            class: NodeClass::InteractiveInput,
            include_hidden: true,
        }
    }

    pub fn matches(&self, node: &NodeRecord) -> bool {
        node.class() == self.class && (self.include_hidden || !node.is_hidden())
    }
}

impl Default for NodeFilter {
    fn default() -> Self {
        Self::interactive()
    }
}

/// The unit of work
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Upstream nodes of the same graph, in input order
    pub upstream: Vec<NodeId>,
    pub state: NodeState,
    pub output: Option<Value>,
    /// Warning or failure message of the last run
    pub message: Option<String>,
}

impl NodeRecord {
    fn new(id: NodeId, name: impl Into<String>, kind: NodeKind, upstream: Vec<NodeId>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            upstream,
            state: NodeState::Idle,
            output: None,
            message: None,
        }
    }

    pub fn ordinary(
        id: NodeId,
        name: impl Into<String>,
        model: Arc<dyn NodeModel>,
        upstream: Vec<NodeId>,
    ) -> Self {
        Self::new(id, name, NodeKind::Ordinary(model), upstream)
    }

    pub fn interactive(
        id: NodeId,
        name: impl Into<String>,
        spec: InteractiveSpec,
        default: Value,
        upstream: Vec<NodeId>,
    ) -> Self {
        let kind = NodeKind::InteractiveInput {
            spec,
            value: default,
        };
        Self::new(id, name, kind, upstream)
    }

    pub fn sub_graph(id: NodeId, name: impl Into<String>, upstream: Vec<NodeId>) -> Self {
        Self::new(id, name, NodeKind::SubGraph, upstream)
    }

    pub fn class(&self) -> NodeClass {
        match self.kind {
            NodeKind::Ordinary(_) => NodeClass::Ordinary,
            NodeKind::InteractiveInput { .. } => NodeClass::InteractiveInput,
            NodeKind::SubGraph => NodeClass::SubGraph,
        }
    }

    pub fn is_hidden(&self) -> bool {
        match &self.kind {
            NodeKind::InteractiveInput { spec, .. } => spec.hidden,
            _ => false,
        }
    }

    pub fn interactive_spec(&self) -> Option<&InteractiveSpec> {
        match &self.kind {
            NodeKind::InteractiveInput { spec, .. } => Some(spec),
            _ => None,
        }
    }

    /// Current value of an interactive input node
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::InteractiveInput { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Back to a pending state, dropping the outputs of the previous run
    pub(crate) fn clear(&mut self) {
        self.state = NodeState::Idle;
        self.output = None;
        self.message = None;
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            class: self.class(),
            hidden: self.is_hidden(),
            state: self.state,
            value: self.value().cloned(),
            output: self.output.clone(),
            message: self.message.clone(),
        }
    }
}

/// Immutable copy of a node, safe to hand across threads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub class: NodeClass,
    pub hidden: bool,
    pub state: NodeState,
    pub value: Option<Value>,
    pub output: Option<Value>,
    pub message: Option<String>,
}
