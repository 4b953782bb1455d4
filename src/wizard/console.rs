// SPDX-License-Identifier: MIT

//! Line-based page presenter for terminals

use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::io::{BufRead, Write};

use crate::flow::graph::ValueType;
use crate::flow::page::{PageDescriptor, PageNode, PagePresenter};

/// Prompts for every node of a page, one line each
///
/// An empty line keeps the current value. Input is read as JSON, except for
/// string-typed nodes which take the line verbatim. A value the node's type
/// rejects is reported and asked for again.
pub struct ConsolePresenter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePresenter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn prompt(&mut self, key: &str, node: &PageNode) -> std::io::Result<Option<Value>> {
        let label = node.representation["label"]
            .as_str()
            .unwrap_or(node.name.as_str());
        if let Some(description) = node.representation["description"].as_str() {
            if !description.is_empty() {
                writeln!(self.output, "  {}", description)?;
            }
        }
        let value_type: ValueType =
            serde_json::from_value(node.representation["value_type"].clone()).unwrap_or_default();

        loop {
            write!(self.output, "[{}] {} ({}): ", key, label, node.value)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                return Ok(None);
            }

            let value = if value_type == ValueType::String {
                Value::String(line.to_string())
            } else {
                serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()))
            };
            if value_type.accepts(&value) {
                return Ok(Some(value));
            }
            writeln!(self.output, "  expected {} value", value_type)?;
        }
    }
}

impl<R: BufRead, W: Write> PagePresenter for ConsolePresenter<R, W> {
    fn present(
        &mut self,
        page: &PageDescriptor,
    ) -> Result<BTreeMap<String, Value>, Box<dyn Error + Send + Sync>> {
        writeln!(self.output, "== Page {} ==", page.container)?;
        let mut values = BTreeMap::new();
        for (key, node) in &page.nodes {
            if let Some(value) = self.prompt(key, node)? {
                values.insert(key.clone(), value);
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::graph::NodeId;
    use crate::flow::page::LayoutPage;
    use serde_json::json;
    use std::io::Cursor;

    fn page() -> PageDescriptor {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "1".to_string(),
            PageNode {
                name: "flag".to_string(),
                representation: json!({"label": "Include details?", "value_type": "boolean"}),
                value: json!(false),
                resource_refs: vec![],
            },
        );
        nodes.insert(
            "2".to_string(),
            PageNode {
                name: "title".to_string(),
                representation: json!({"label": "Title", "value_type": "string"}),
                value: json!("untitled"),
                resource_refs: vec![],
            },
        );
        nodes.insert(
            "3".to_string(),
            PageNode {
                name: "count".to_string(),
                representation: json!({"label": "Count", "value_type": "integer"}),
                value: json!(1),
                resource_refs: vec![],
            },
        );
        PageDescriptor {
            container: NodeId::root(),
            layout: LayoutPage::default(),
            nodes,
        }
    }

    #[test]
    fn test_reads_typed_values() {
        let input = Cursor::new("true\n42\n\n");
        let mut output = Vec::new();
        let values = ConsolePresenter::new(input, &mut output)
            .present(&page())
            .unwrap();

        assert_eq!(values.get("1"), Some(&json!(true)));
        // strings are taken verbatim, even when they look like JSON
        assert_eq!(values.get("2"), Some(&json!("42")));
        // empty line keeps the current value
        assert!(!values.contains_key("3"));

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("== Page 0 =="));
        assert!(printed.contains("[1] Include details? (false): "));
    }

    #[test]
    fn test_mistyped_value_is_asked_again() {
        let input = Cursor::new("yes\ntrue\n\nseven\n7\n");
        let mut output = Vec::new();
        let values = ConsolePresenter::new(input, &mut output)
            .present(&page())
            .unwrap();

        assert_eq!(values.get("1"), Some(&json!(true)));
        assert!(!values.contains_key("2"));
        assert_eq!(values.get("3"), Some(&json!(7)));

        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches("[1] Include details?").count(), 2);
        assert!(printed.contains("expected boolean value"));
        assert!(printed.contains("expected integer value"));
    }

    #[test]
    fn test_end_of_input_keeps_values() {
        let values = ConsolePresenter::new(Cursor::new(""), Vec::new())
            .present(&page())
            .unwrap();
        assert!(values.is_empty());
    }
}
