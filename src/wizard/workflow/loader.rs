// SPDX-License-Identifier: MIT

//! Workflow loader - YAML file loading and parsing

use super::types::WorkflowDefinition;
use crate::flow::error::{Result, WorkflowError};
use std::fs;
use std::path::Path;

/// Loads workflow definitions from YAML files
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a workflow definition from a YAML file
    pub fn load_workflow<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDefinition> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(WorkflowError::FileNotFound(path.display().to_string()).into());
        }
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a workflow definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<WorkflowDefinition> {
        let def: WorkflowDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }
}

impl Default for WorkflowLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::error::FlowError;
    use crate::flow::graph::ValueType;
    use crate::wizard::workflow::types::DependsOn;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_parse_flat_workflow() {
        let yaml = r#"
name: Report
description: "Ask for a flag, then show it"

nodes:
  - id: 1
    name: Include details
    kind: input
    input:
      value_type: boolean
      default: false
      label: "Include details?"
  - id: 14
    type: view
    depends_on: 1
"#;
        let def = WorkflowLoader::parse_yaml(yaml).unwrap();
        assert_eq!(def.name, "Report");
        assert_eq!(def.nodes.len(), 2);

        let input = &def.nodes[0];
        assert_eq!(input.kind, "input");
        let settings = input.input.as_ref().unwrap();
        assert_eq!(settings.value_type, ValueType::Boolean);
        assert_eq!(settings.default, json!(false));
        assert!(!settings.hidden);

        let view = &def.nodes[1];
        assert_eq!(view.node_type.as_deref(), Some("view"));
        assert_eq!(view.depends_on, DependsOn::Single(1));
    }

    #[test]
    fn test_parse_inline_subgraph() {
        let yaml = r#"
name: Outer
nodes:
  - id: 5
    kind: subgraph
    workflow:
      name: Inner page
      layout: '{"rows": []}'
      nodes:
        - id: 1
          kind: input
          input:
            value_type: integer
            default: 3
        - id: 2
          type: passthrough
          depends_on: [1]
"#;
        let def = WorkflowLoader::parse_yaml(yaml).unwrap();
        let inner = def.nodes[0].workflow.as_ref().unwrap();
        assert_eq!(inner.name, "Inner page");
        assert!(inner.layout.is_some());
        assert_eq!(inner.nodes[1].depends_on, DependsOn::Multiple(vec![1]));
    }

    #[test]
    fn test_parse_config_values() {
        let yaml = r#"
name: Configured
nodes:
  - id: 1
    type: constant
    config:
      value: {"rows": [1, 2, 3]}
"#;
        let def = WorkflowLoader::parse_yaml(yaml).unwrap();
        assert_eq!(def.nodes[0].config["value"]["rows"], json!([1, 2, 3]));
    }

    #[test]
    fn test_invalid_yaml_returns_error() {
        let yaml = r#"
name:
  - invalid structure
"#;
        let result = WorkflowLoader::parse_yaml(yaml);
        assert!(matches!(result, Err(FlowError::Yaml(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: FromDisk\nnodes: []").unwrap();

        let def = WorkflowLoader::new().load_workflow(file.path()).unwrap();
        assert_eq!(def.name, "FromDisk");
    }

    #[test]
    fn test_missing_file() {
        let result = WorkflowLoader::new().load_workflow("does/not/exist.yaml");
        assert!(matches!(
            result,
            Err(FlowError::Workflow(WorkflowError::FileNotFound(_)))
        ));
    }
}
