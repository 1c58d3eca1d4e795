//! Tool definitions for model function calling

use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::types::ContentBlock;

/// Tool errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Response has no content blocks")]
    NoContent,

    #[error("Duplicate tool name: {0}")]
    DuplicateName(String),

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    #[error("Tool execution failed: {0}")]
    Execution(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Async handler executing one tool call
pub type ToolHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// JSON Schema for a type, used as a tool's parameter declaration
pub fn schema_of<T: JsonSchema>() -> Value {
    let schema = schemars::gen::SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<T>();
    serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}))
}

/// A callable exposed to the model with a declared argument schema
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    parameters: Value,
    handler: ToolHandler,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

impl Tool {
    /// Create a tool from an explicit JSON Schema and handler
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: ToolHandler,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }

    /// Create a tool whose arguments deserialize into a typed struct
    ///
    /// The parameter schema is derived from the argument type; malformed
    /// call input surfaces as [`ToolError::InvalidInput`].
    pub fn typed<Args, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        Args: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let wrapped: ToolHandler = Arc::new(move |input: Value| {
            let handler = handler.clone();
            Box::pin(async move {
                let args: Args = serde_json::from_value(input)
                    .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
                handler(args).await
            })
        });

        Self::new(name, description, schema_of::<Args>(), wrapped)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Function-calling wire shape for this tool
    pub fn to_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }

    /// Execute the tool with the call's input object
    pub async fn invoke(&self, input: Value) -> Result<Value, ToolError> {
        (self.handler)(input).await
    }
}

/// Result of one executed tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: Value,
}

impl ToolResult {
    pub fn new(tool_use_id: impl Into<String>, content: Value) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            content,
        }
    }

    /// Package as a content block for the follow-up message
    pub fn to_block(&self) -> ContentBlock {
        ContentBlock::ToolResult {
            tool_use_id: self.tool_use_id.clone(),
            content: self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        message: String,
    }

    fn echo_tool() -> Tool {
        Tool::typed("echo", "Echo the message back", |args: EchoArgs| async move {
            Ok(json!(args.message))
        })
    }

    #[tokio::test]
    async fn test_typed_tool_invocation() {
        let tool = echo_tool();
        let result = tool.invoke(json!({"message": "hola"})).await.unwrap();
        assert_eq!(result, json!("hola"));
    }

    #[tokio::test]
    async fn test_typed_tool_rejects_bad_input() {
        let tool = echo_tool();
        let result = tool.invoke(json!({"wrong_field": 42})).await;
        assert!(matches!(result, Err(ToolError::InvalidInput(_))));
    }

    #[test]
    fn test_to_schema_shape() {
        let tool = echo_tool();
        let schema = tool.to_schema();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "echo");
        assert!(schema["function"]["parameters"].is_object());
    }

    #[test]
    fn test_tool_result_block() {
        let result = ToolResult::new("call-1", json!({"ok": true}));
        match result.to_block() {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => {
                assert_eq!(tool_use_id, "call-1");
                assert_eq!(content, json!({"ok": true}));
            }
            other => panic!("unexpected block: {:?}", other),
        }
    }
}
