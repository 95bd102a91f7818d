//! Tool trait: computations the model may request mid-conversation.
//!
//! Tools are supplied entirely by the caller. The registry checks that every
//! tool is keyed under its own definition name and hands the definitions to
//! the backend in a stable order.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::ToolError;
use crate::provider::{ModelTier, ToolDefinition};

/// A request to execute a tool, as issued by the backend.
pub use crate::message::MessageToolCall as ToolCall;

/// The core Tool trait.
///
/// Implementations may keep state across `compute` calls within one
/// question (behind their own lock); the loop never calls two tools at once.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema sent to the LLM.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool on the raw JSON arguments produced by the model and
    /// return the result text that goes back into the conversation.
    async fn compute(&self, arguments: &str) -> std::result::Result<String, ToolError>;
}

/// A validated set of tools for one question.
///
/// Built with [`ToolRegistry::bind`]; iteration order is by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a caller-supplied tool map.
    ///
    /// Fails with [`ToolError::NameMismatch`] when a key differs from the
    /// name in the tool's own definition.
    pub fn bind(tools: &HashMap<String, Arc<dyn Tool>>) -> std::result::Result<Self, ToolError> {
        let mut bound = BTreeMap::new();
        for (key, tool) in tools {
            let defined = tool.definition().name;
            if *key != defined {
                return Err(ToolError::NameMismatch {
                    key: key.clone(),
                    defined,
                });
            }
            bound.insert(key.clone(), Arc::clone(tool));
        }
        Ok(Self { tools: bound })
    }

    /// Register a tool under its definition name. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
    }

    /// Tool definitions for the given model tier, sorted by name.
    ///
    /// Tiers without function calling get an empty list.
    pub fn definitions(&self, tier: ModelTier) -> Vec<ToolDefinition> {
        if !tier.supports_tools() {
            return Vec::new();
        }
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Execute a tool call.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<String, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.compute(&call.arguments).await
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test tool for unit tests.
    struct EchoTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: self.name.into(),
                description: "Echoes back the input".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" }
                    },
                    "required": ["text"]
                }),
            }
        }

        async fn compute(&self, arguments: &str) -> std::result::Result<String, ToolError> {
            let args: serde_json::Value = serde_json::from_str(arguments)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
            Ok(args["text"].as_str().unwrap_or("").to_string())
        }
    }

    fn tool(name: &'static str) -> Arc<dyn Tool> {
        Arc::new(EchoTool { name })
    }

    #[test]
    fn bind_rejects_mismatched_key() {
        let mut tools = HashMap::new();
        tools.insert("sum".to_string(), tool("mult"));
        tools.insert("mult".to_string(), tool("mult"));

        let err = ToolRegistry::bind(&tools).err().unwrap();
        match err {
            ToolError::NameMismatch { key, defined } => {
                assert_eq!(key, "sum");
                assert_eq!(defined, "mult");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        let mut tools = HashMap::new();
        for name in ["mult", "exp", "sum"] {
            tools.insert(name.to_string(), tool(name));
        }
        let registry = ToolRegistry::bind(&tools).unwrap();
        let names: Vec<_> = registry
            .definitions(ModelTier::Text)
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["exp", "mult", "sum"]);
    }

    #[test]
    fn vision_tier_gets_no_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("echo"));
        assert_eq!(registry.len(), 1);
        assert!(registry.definitions(ModelTier::Vision).is_empty());
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("echo"));

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: r#"{"text": "hello world"}"#.into(),
        };
        let result = registry.execute(&call).await.unwrap();
        assert_eq!(result, "hello world");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: "{}".into(),
        };
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "nonexistent"));
    }
}
