// SPDX-License-Identifier: MIT

//! Boundary between the execution core and whatever displays pages
//!
//! A page is the set of interactive nodes currently waiting inside one
//! container, plus the container's layout. Presenters only ever see copies.

pub mod layout;

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;

use crate::flow::error::{FlowError, Result};
use crate::flow::graph::{GraphArena, NodeId, NodeState};

pub use layout::{LayoutColumn, LayoutContent, LayoutPage, LayoutRow};

/// Display-ready copy of one waiting node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageNode {
    pub name: String,
    pub representation: Value,
    pub value: Value,
    pub resource_refs: Vec<String>,
}

/// Waiting interactive nodes of a container, keyed by node suffix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDescriptor {
    pub container: NodeId,
    pub layout: LayoutPage,
    pub nodes: BTreeMap<String, PageNode>,
}

impl PageDescriptor {
    /// Collect the visible `CONFIGURED` interactive nodes inside `container`
    pub fn assemble(arena: &GraphArena, container: &NodeId) -> Result<Self> {
        let graph = arena.graph(container)?;
        let layout = match graph.layout() {
            Some(raw) => LayoutPage::parse(raw, &container.suffix()).map_err(|source| {
                FlowError::Layout {
                    container: container.clone(),
                    source,
                }
            })?,
            None => LayoutPage::default(),
        };

        let nodes = arena
            .nodes_within(container)
            .filter(|n| n.state == NodeState::Configured && !n.is_hidden())
            .filter_map(|n| {
                let spec = n.interactive_spec()?;
                let page_node = PageNode {
                    name: n.name.clone(),
                    representation: spec.representation.clone(),
                    value: n.value().cloned().unwrap_or(Value::Null),
                    resource_refs: spec.resource_refs.clone(),
                };
                Some((n.id.suffix().to_string(), page_node))
            })
            .collect();

        Ok(Self {
            container: container.clone(),
            layout,
            nodes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Shows a page and collects the values the user entered
///
/// Returned keys are the suffixes of [`PageDescriptor::nodes`]; nodes left
/// out keep their current value.
pub trait PagePresenter {
    fn present(
        &mut self,
        page: &PageDescriptor,
    ) -> std::result::Result<BTreeMap<String, Value>, Box<dyn Error + Send + Sync>>;
}
