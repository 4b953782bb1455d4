// SPDX-License-Identifier: MIT

use crate::flow::graph::NodeModel;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Creates node models of one registered type from their configuration
pub trait NodeFactory: Send + Sync {
    /// Type name used by the `type` field of node definitions
    fn type_name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the accepted configuration
    fn schema(&self) -> &Value;

    fn create(&self, config: &Value) -> Result<Arc<dyn NodeModel>, Box<dyn Error + Send + Sync>>;
}

#[derive(Clone)]
pub struct NodeRegistry {
    factories: Arc<RwLock<HashMap<String, Arc<dyn NodeFactory>>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, factory: Arc<dyn NodeFactory>) {
        let mut factories = self.factories.write().await;
        factories.insert(factory.type_name().to_string(), factory);
    }

    pub async fn get(&self, type_name: &str) -> Option<Arc<dyn NodeFactory>> {
        let factories = self.factories.read().await;
        factories.get(type_name).cloned()
    }

    /// Registered factories sorted by type name
    pub async fn list(&self) -> Vec<Arc<dyn NodeFactory>> {
        let factories = self.factories.read().await;
        let mut all: Vec<_> = factories.values().cloned().collect();
        all.sort_by(|a, b| a.type_name().cmp(b.type_name()));
        all
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
