// SPDX-License-Identifier: MIT

//! YAML schema types for workflow definitions
//!
//! A workflow is a list of numbered nodes. Sub-graph nodes carry their child
//! workflow inline or reference another YAML file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::flow::graph::ValueType;

/// Top-level workflow definition
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Page layout JSON, used when the workflow is shown as a wizard page
    pub layout: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

/// A node in a workflow
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NodeDefinition {
    /// Node number, unique within its workflow
    pub id: u32,
    pub name: Option<String>,
    /// Node kind: "node" (default), "input", or "subgraph"
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Registered node type (for "node" kind)
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    /// Type specific configuration handed to the node factory
    #[serde(default)]
    pub config: Value,
    /// Upstream nodes, in input order
    #[serde(default)]
    pub depends_on: DependsOn,
    /// Interactive input settings (for "input" kind)
    pub input: Option<InputDefinition>,
    /// Inline child workflow (for "subgraph" kind)
    pub workflow: Option<Box<WorkflowDefinition>>,
    /// Child workflow file, relative to the including file (for "subgraph" kind)
    pub file: Option<String>,
}

fn default_kind() -> String {
    "node".to_string()
}

impl NodeDefinition {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.node_type.clone())
            .unwrap_or_else(|| format!("{} {}", self.kind, self.id))
    }
}

/// Interactive input settings
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct InputDefinition {
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default)]
    pub default: Value,
    /// Hidden inputs are not shown as wizard pages
    #[serde(default)]
    pub hidden: bool,
    pub label: Option<String>,
    pub description: Option<String>,
    /// Script/stylesheet references for the page presenter
    #[serde(default)]
    pub resources: Vec<String>,
}

/// Dependency specification (single id or array)
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(untagged)]
pub enum DependsOn {
    #[default]
    None,
    Single(u32),
    Multiple(Vec<u32>),
}

impl DependsOn {
    pub fn to_vec(&self) -> Vec<u32> {
        match self {
            DependsOn::None => vec![],
            DependsOn::Single(id) => vec![*id],
            DependsOn::Multiple(ids) => ids.clone(),
        }
    }
}
