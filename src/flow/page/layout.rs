// SPDX-License-Identifier: MIT

//! Page layout metadata
//!
//! A layout is a grid of rows and columns whose cells are nested rows or
//! views. Views name nodes by their local number inside the page's graph;
//! parsing rewrites them to root-relative suffixes so they match the keys of
//! a [`PageDescriptor`](super::PageDescriptor).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::flow::error::LayoutParseError;
use crate::flow::graph::NodeIdSuffix;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutPage {
    #[serde(default)]
    pub rows: Vec<LayoutRow>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutRow {
    #[serde(default)]
    pub columns: Vec<LayoutColumn>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutColumn {
    #[serde(default)]
    pub content: Vec<LayoutContent>,
    /// Presentation hints (width, css classes), passed through untouched
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutContent {
    Row(LayoutRow),
    View {
        node_id: String,
        #[serde(flatten)]
        options: Map<String, Value>,
    },
}

impl LayoutPage {
    /// Parse layout JSON of the graph at `page`
    ///
    /// Blank input yields an empty layout.
    pub fn parse(raw: &str, page: &NodeIdSuffix) -> Result<Self, LayoutParseError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut layout: LayoutPage = serde_json::from_str(raw)?;
        for row in &mut layout.rows {
            row.qualify(page)?;
        }
        Ok(layout)
    }

    /// Node suffixes referenced by views, in reading order
    pub fn view_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for row in &self.rows {
            row.collect_views(&mut ids);
        }
        ids
    }
}

impl LayoutRow {
    fn qualify(&mut self, page: &NodeIdSuffix) -> Result<(), LayoutParseError> {
        for column in &mut self.columns {
            for content in &mut column.content {
                match content {
                    LayoutContent::Row(row) => row.qualify(page)?,
                    LayoutContent::View { node_id, .. } => {
                        let local: u32 = node_id
                            .trim()
                            .parse()
                            .map_err(|_| LayoutParseError::ViewNodeId(node_id.clone()))?;
                        *node_id = page.child(local).to_string();
                    }
                }
            }
        }
        Ok(())
    }

    fn collect_views(&self, ids: &mut Vec<String>) {
        for column in &self.columns {
            for content in &column.content {
                match content {
                    LayoutContent::Row(row) => row.collect_views(ids),
                    LayoutContent::View { node_id, .. } => ids.push(node_id.clone()),
                }
            }
        }
    }
}
