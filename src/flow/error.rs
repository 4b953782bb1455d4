// SPDX-License-Identifier: MIT

//! Typed error handling for the execution core
//!
//! Only usage errors surface here. Failures raised by node models are kept on
//! the node itself and never cross the scheduler boundary.

use thiserror::Error;

use crate::flow::graph::{NodeId, ParseNodeIdError, ValueType};

/// Top-level error type for the execution core
#[derive(Debug, Error)]
pub enum FlowError {
    /// The id does not name a node (or graph) of the session
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// A textual node id could not be parsed
    #[error(transparent)]
    InvalidId(#[from] ParseNodeIdError),

    /// The id names a node that does not own a graph
    #[error("Node {0} is not a workflow container")]
    NotAContainer(NodeId),

    /// A value was addressed to a node that does not accept external input
    #[error("Node {0} is not an interactive input node")]
    NotInteractive(NodeId),

    /// The operation would touch a node that is currently running
    #[error("Node {0} is currently executing")]
    NodeExecuting(NodeId),

    /// The page layout metadata of a container could not be parsed
    #[error("Layout for page {container} could not be generated: {source}")]
    Layout {
        container: NodeId,
        #[source]
        source: LayoutParseError,
    },

    /// A supplied value does not match the node's declared value type
    #[error("Node {node} expects a {expected} value, got {found}")]
    ValueType {
        node: NodeId,
        expected: ValueType,
        found: String,
    },

    /// Workflow definition errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors found while loading or building a workflow definition
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Two nodes of the same graph share an id
    #[error("Duplicate node id {0}")]
    DuplicateNode(NodeId),

    /// A node depends on an id that is not part of its graph
    #[error("Node {node} depends on unknown node {dependency}")]
    UnknownDependency { node: NodeId, dependency: NodeId },

    /// Circular dependency detected in a graph
    #[error("Circular dependency detected: {0:?}")]
    CircularDependency(Vec<String>),

    /// No factory registered for a node type
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Unknown node kind in a definition
    #[error("Unknown node kind: {0}")]
    UnknownKind(String),

    /// A definition lacks a section its kind requires
    #[error("Node {node} is missing its '{section}' section")]
    MissingSection { node: String, section: String },

    /// A node factory rejected its configuration
    #[error("Invalid configuration for node {node}: {message}")]
    InvalidConfig { node: String, message: String },

    /// File not found when loading a workflow
    #[error("Workflow file not found: {0}")]
    FileNotFound(String),
}

/// Cause attached to [`FlowError::Layout`]
#[derive(Debug, Error)]
pub enum LayoutParseError {
    #[error("malformed layout JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("view references node '{0}', which is not a node number")]
    ViewNodeId(String),
}

impl FlowError {
    /// Create a value type error from the offending value
    pub fn value_type(node: NodeId, expected: ValueType, found: &serde_json::Value) -> Self {
        let found = match found {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "boolean",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        };
        Self::ValueType {
            node,
            expected,
            found: found.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::error::Error as _;

    #[test]
    fn test_layout_error_keeps_cause() {
        let cause = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = FlowError::Layout {
            container: NodeId::root(),
            source: LayoutParseError::Json(cause),
        };

        assert!(err.to_string().starts_with("Layout for page 0"));
        let source = err.source().expect("layout errors carry a cause");
        assert!(source.to_string().contains("malformed layout JSON"));
    }

    #[test]
    fn test_value_type_error_names_found_type() {
        let err = FlowError::value_type(NodeId::root().child(1), ValueType::Boolean, &json!("yes"));
        assert_eq!(err.to_string(), "Node 0:1 expects a boolean value, got string");
    }

    #[test]
    fn test_workflow_error_converts() {
        let err: FlowError = WorkflowError::UnknownNodeType("sorter".to_string()).into();
        assert!(matches!(err, FlowError::Workflow(WorkflowError::UnknownNodeType(_))));
    }
}
