//! Tool registry
//!
//! Maps tool names to their declared definition (name, description, input
//! schema) and the handler that runs them. Populated once at startup.

use crate::mcp::protocol::{Tool, ToolContent};
use crate::registry::naming::resolve_tool_name;
use crate::types::{Result, RuntimeError};
use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a tool handler hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    Json(Value),
    Content(Vec<ToolContent>),
}

impl ToolOutput {
    /// Text stays text, JSON is pretty-printed, content blocks pass through.
    pub fn into_content(self) -> Vec<ToolContent> {
        match self {
            ToolOutput::Text(text) | ToolOutput::Json(Value::String(text)) => {
                vec![ToolContent::Text { text }]
            }
            ToolOutput::Json(value) => {
                let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                vec![ToolContent::Text { text }]
            }
            ToolOutput::Content(content) => content,
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Json(value)
    }
}

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Value) -> anyhow::Result<ToolOutput>;
}

struct FnToolHandler<F>(F);

#[async_trait]
impl<F, Fut> ToolHandler for FnToolHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
{
    async fn call(&self, arguments: Value) -> anyhow::Result<ToolOutput> {
        (self.0)(arguments).await
    }
}

struct RegisteredTool {
    definition: Tool,
    validator: Validator,
    handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    fn validate(&self, arguments: &Value) -> Result<()> {
        if self.validator.is_valid(arguments) {
            return Ok(());
        }

        let reason = self
            .validator
            .iter_errors(arguments)
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");

        Err(RuntimeError::InvalidArguments {
            tool: self.definition.name.clone(),
            reason,
        })
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool of the same name.
    ///
    /// Fails if the declared input schema is not a valid JSON Schema.
    pub fn register(&mut self, definition: Tool, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let validator = jsonschema::validator_for(&definition.input_schema).map_err(|e| {
            RuntimeError::InvalidSchema {
                tool: definition.name.clone(),
                reason: e.to_string(),
            }
        })?;

        let name = definition.name.clone();
        if self.tools.contains_key(&name) {
            warn!("Replacing already registered tool: {}", name);
        }

        self.tools.insert(
            name.clone(),
            RegisteredTool {
                definition,
                validator,
                handler,
            },
        );
        debug!("Registered tool: {}", name);

        Ok(())
    }

    /// Register an async closure as a tool.
    pub fn register_fn<F, Fut>(&mut self, definition: Tool, handler: F) -> Result<()>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
    {
        self.register(definition, Arc::new(FnToolHandler(handler)))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Tool definitions sorted by name.
    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        resolve_tool_name(name, self.tools.keys().map(String::as_str))
    }

    /// Validate `arguments` against the tool's schema and run it.
    ///
    /// Missing arguments are treated as an empty object.
    pub async fn call(&self, name: &str, arguments: Option<Value>) -> Result<ToolOutput> {
        let resolved = self
            .resolve(name)
            .ok_or_else(|| RuntimeError::ToolNotFound(name.to_string()))?;
        let tool = self
            .tools
            .get(resolved)
            .ok_or_else(|| RuntimeError::ToolNotFound(name.to_string()))?;

        let arguments = match arguments {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(arguments) => arguments,
        };
        tool.validate(&arguments)?;

        if resolved != name {
            debug!("Resolved tool name '{}' to '{}'", name, resolved);
        }
        debug!("Executing tool '{}' with arguments: {}", resolved, arguments);

        tool.handler
            .call(arguments)
            .await
            .map_err(|cause| RuntimeError::ToolFailed {
                tool: resolved.to_string(),
                cause,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_tool() -> Tool {
        Tool {
            name: "add_numbers".to_string(),
            description: "Add two numbers".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "x": { "type": "integer" },
                    "y": { "type": "integer" }
                },
                "required": ["x", "y"]
            }),
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn(add_tool(), |args| async move {
                let x = args["x"].as_i64().unwrap_or_default();
                let y = args["y"].as_i64().unwrap_or_default();
                Ok(ToolOutput::Json(json!(x + y)))
            })
            .unwrap();
        registry
            .register_fn(
                Tool {
                    name: "error_tool".to_string(),
                    description: "Raises an error".to_string(),
                    input_schema: json!({ "type": "object" }),
                },
                |_| async { Err(anyhow::anyhow!("oh no")) },
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_call_by_name() {
        let registry = registry();
        let out = registry
            .call("add_numbers", Some(json!({ "x": 2, "y": 3 })))
            .await
            .unwrap();
        assert_eq!(out, ToolOutput::Json(json!(5)));
    }

    #[tokio::test]
    async fn test_call_via_dotted_alias() {
        let registry = registry();
        let out = registry
            .call("add.numbers", Some(json!({ "x": 1, "y": 1 })))
            .await
            .unwrap();
        assert_eq!(out, ToolOutput::Json(json!(2)));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = registry().call("nonexistent_tool", None).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ToolNotFound(_)));
        assert_eq!(err.to_string(), "Tool not found: nonexistent_tool");
    }

    #[tokio::test]
    async fn test_schema_violation() {
        let err = registry()
            .call("add_numbers", Some(json!({ "x": "two" })))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_handler_error_message() {
        let err = registry().call("error_tool", None).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ToolFailed { .. }));
        assert_eq!(err.to_string(), "oh no");
    }

    #[test]
    fn test_definitions_sorted() {
        let registry = registry();
        let names: Vec<String> = registry.definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["add_numbers", "error_tool"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let mut registry = ToolRegistry::new();
        let bad = Tool {
            name: "bad".to_string(),
            description: String::new(),
            input_schema: json!({ "type": "string", "pattern": "(unclosed" }),
        };
        let result = registry.register_fn(bad, |_| async { Ok(ToolOutput::from("never")) });
        assert!(matches!(result, Err(RuntimeError::InvalidSchema { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_output_conversion() {
        let text = ToolOutput::from("plain").into_content();
        assert_eq!(text, vec![ToolContent::Text { text: "plain".into() }]);

        let json = ToolOutput::from(json!({ "a": 1 })).into_content();
        match &json[0] {
            ToolContent::Text { text } => {
                assert_eq!(serde_json::from_str::<Value>(text).unwrap(), json!({ "a": 1 }));
            }
            other => panic!("unexpected content {:?}", other),
        }

        let string_json = ToolOutput::Json(json!("already text")).into_content();
        assert_eq!(string_json, vec![ToolContent::Text { text: "already text".into() }]);
    }
}
