// SPDX-License-Identifier: MIT

//! Built-in node types
//!
//! Every model merges its inputs the same way: no input gives `null`, a
//! single input is passed as is, several inputs become an array.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use crate::flow::graph::{NodeModel, NodeOutput};
use crate::wizard::workflow::registry::{NodeFactory, NodeRegistry};

type ModelResult = Result<Arc<dyn NodeModel>, Box<dyn Error + Send + Sync>>;

// --- Static schemas ---

static CONSTANT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "value": { "description": "Value emitted as the node's output" }
        }
    })
});

static EMPTY_SCHEMA: Lazy<Value> = Lazy::new(|| json!({"type": "object", "properties": {}}));

static VIEW_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": "Heading printed with the value" }
        }
    })
});

static DELAY_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "millis": { "type": "integer", "description": "Time to sleep before passing inputs on" }
        },
        "required": ["millis"]
    })
});

static MESSAGE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "message": { "type": "string" }
        }
    })
});

// --- Configs ---

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConstantConfig {
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ViewConfig {
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DelayConfig {
    pub millis: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MessageConfig {
    pub message: Option<String>,
}

fn parse_config<T: DeserializeOwned + Default>(config: &Value) -> Result<T, serde_json::Error> {
    if config.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(config.clone())
}

/// Merge upstream outputs into one value
pub fn merge_inputs(mut inputs: Vec<Value>) -> Value {
    match inputs.len() {
        0 => Value::Null,
        1 => inputs.remove(0),
        _ => Value::Array(inputs),
    }
}

// --- Models ---

pub struct ConstantNode {
    value: Value,
}

#[async_trait]
impl NodeModel for ConstantNode {
    fn type_name(&self) -> &str {
        "constant"
    }

    async fn execute(&self, _inputs: Vec<Value>) -> Result<NodeOutput, Box<dyn Error + Send + Sync>> {
        Ok(NodeOutput::new(self.value.clone()))
    }
}

pub struct PassthroughNode;

#[async_trait]
impl NodeModel for PassthroughNode {
    fn type_name(&self) -> &str {
        "passthrough"
    }

    async fn execute(&self, inputs: Vec<Value>) -> Result<NodeOutput, Box<dyn Error + Send + Sync>> {
        Ok(NodeOutput::new(merge_inputs(inputs)))
    }
}

/// Terminal node that reports what reaches it
pub struct ViewNode {
    title: String,
}

#[async_trait]
impl NodeModel for ViewNode {
    fn type_name(&self) -> &str {
        "view"
    }

    async fn execute(&self, inputs: Vec<Value>) -> Result<NodeOutput, Box<dyn Error + Send + Sync>> {
        let value = merge_inputs(inputs);
        log::info!("{}: {}", self.title, value);
        Ok(NodeOutput::new(value))
    }
}

pub struct DelayNode {
    delay: Duration,
}

#[async_trait]
impl NodeModel for DelayNode {
    fn type_name(&self) -> &str {
        "delay"
    }

    async fn execute(&self, inputs: Vec<Value>) -> Result<NodeOutput, Box<dyn Error + Send + Sync>> {
        tokio::time::sleep(self.delay).await;
        Ok(NodeOutput::new(merge_inputs(inputs)))
    }
}

/// Passes inputs on but finishes with a warning
pub struct WarnNode {
    message: String,
}

#[async_trait]
impl NodeModel for WarnNode {
    fn type_name(&self) -> &str {
        "warn"
    }

    async fn execute(&self, inputs: Vec<Value>) -> Result<NodeOutput, Box<dyn Error + Send + Sync>> {
        Ok(NodeOutput::with_warning(merge_inputs(inputs), self.message.clone()))
    }
}

pub struct FailNode {
    message: String,
}

#[async_trait]
impl NodeModel for FailNode {
    fn type_name(&self) -> &str {
        "fail"
    }

    async fn execute(&self, _inputs: Vec<Value>) -> Result<NodeOutput, Box<dyn Error + Send + Sync>> {
        Err(self.message.clone().into())
    }
}

// --- Factories ---

/// Factory for one built-in type
pub struct BuiltinFactory {
    type_name: &'static str,
    description: &'static str,
    schema: &'static Lazy<Value>,
    build: fn(&Value) -> ModelResult,
}

impl NodeFactory for BuiltinFactory {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn schema(&self) -> &Value {
        self.schema
    }

    fn create(&self, config: &Value) -> ModelResult {
        (self.build)(config)
    }
}

fn build_constant(config: &Value) -> ModelResult {
    let config: ConstantConfig = parse_config(config)?;
    Ok(Arc::new(ConstantNode { value: config.value }))
}

fn build_passthrough(_config: &Value) -> ModelResult {
    Ok(Arc::new(PassthroughNode))
}

fn build_view(config: &Value) -> ModelResult {
    let config: ViewConfig = parse_config(config)?;
    Ok(Arc::new(ViewNode {
        title: config.title.unwrap_or_else(|| "View".to_string()),
    }))
}

fn build_delay(config: &Value) -> ModelResult {
    let config: DelayConfig = serde_json::from_value(config.clone())?;
    Ok(Arc::new(DelayNode {
        delay: Duration::from_millis(config.millis),
    }))
}

fn build_warn(config: &Value) -> ModelResult {
    let config: MessageConfig = parse_config(config)?;
    Ok(Arc::new(WarnNode {
        message: config.message.unwrap_or_else(|| "warning".to_string()),
    }))
}

fn build_fail(config: &Value) -> ModelResult {
    let config: MessageConfig = parse_config(config)?;
    Ok(Arc::new(FailNode {
        message: config.message.unwrap_or_else(|| "node failed".to_string()),
    }))
}

/// All built-in factories
pub fn builtin_factories() -> Vec<Arc<dyn NodeFactory>> {
    vec![
        Arc::new(BuiltinFactory {
            type_name: "constant",
            description: "Emit a configured value",
            schema: &CONSTANT_SCHEMA,
            build: build_constant,
        }),
        Arc::new(BuiltinFactory {
            type_name: "passthrough",
            description: "Pass upstream outputs on unchanged",
            schema: &EMPTY_SCHEMA,
            build: build_passthrough,
        }),
        Arc::new(BuiltinFactory {
            type_name: "view",
            description: "Log and emit upstream outputs",
            schema: &VIEW_SCHEMA,
            build: build_view,
        }),
        Arc::new(BuiltinFactory {
            type_name: "delay",
            description: "Sleep, then pass upstream outputs on",
            schema: &DELAY_SCHEMA,
            build: build_delay,
        }),
        Arc::new(BuiltinFactory {
            type_name: "warn",
            description: "Pass upstream outputs on with a warning",
            schema: &MESSAGE_SCHEMA,
            build: build_warn,
        }),
        Arc::new(BuiltinFactory {
            type_name: "fail",
            description: "Always fail with the configured message",
            schema: &MESSAGE_SCHEMA,
            build: build_fail,
        }),
    ]
}

/// Register every built-in node type
pub async fn register_builtins(registry: &NodeRegistry) {
    for factory in builtin_factories() {
        log::debug!("Registered node type: {}", factory.type_name());
        registry.register(factory).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create(type_name: &str, config: Value) -> Arc<dyn NodeModel> {
        let registry = NodeRegistry::new();
        register_builtins(&registry).await;
        registry
            .get(type_name)
            .await
            .expect("built-in type")
            .create(&config)
            .expect("valid config")
    }

    #[test]
    fn test_merge_inputs() {
        assert_eq!(merge_inputs(vec![]), Value::Null);
        assert_eq!(merge_inputs(vec![json!(1)]), json!(1));
        assert_eq!(merge_inputs(vec![json!(1), json!("a")]), json!([1, "a"]));
    }

    #[tokio::test]
    async fn test_constant_ignores_inputs() {
        let model = create("constant", json!({"value": {"answer": 42}})).await;
        let output = model.execute(vec![json!("ignored")]).await.unwrap();
        assert_eq!(output.value, json!({"answer": 42}));
    }

    #[tokio::test]
    async fn test_passthrough_and_view() {
        let model = create("passthrough", Value::Null).await;
        let output = model.execute(vec![json!(true)]).await.unwrap();
        assert_eq!(output.value, json!(true));

        let model = create("view", json!({"title": "Result"})).await;
        let output = model.execute(vec![json!(1), json!(2)]).await.unwrap();
        assert_eq!(output.value, json!([1, 2]));
        assert!(output.warning.is_none());
    }

    #[tokio::test]
    async fn test_warn_sets_warning() {
        let model = create("warn", json!({"message": "column missing"})).await;
        let output = model.execute(vec![json!(1)]).await.unwrap();
        assert_eq!(output.warning.as_deref(), Some("column missing"));
        assert_eq!(output.value, json!(1));
    }

    #[tokio::test]
    async fn test_fail_returns_error() {
        let model = create("fail", json!({"message": "no data"})).await;
        let err = model.execute(vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "no data");
    }

    #[tokio::test]
    async fn test_delay_sleeps() {
        let model = create("delay", json!({"millis": 20})).await;
        let started = std::time::Instant::now();
        let output = model.execute(vec![json!("x")]).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(output.value, json!("x"));
    }

    #[test]
    fn test_delay_requires_millis() {
        let factory = builtin_factories()
            .into_iter()
            .find(|f| f.type_name() == "delay")
            .unwrap();
        assert!(factory.create(&Value::Null).is_err());
        assert_eq!(factory.schema()["required"], json!(["millis"]));
    }
}
