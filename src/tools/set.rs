//! Tool set: name-keyed registry and tool-call dispatch

use super::tool::{Tool, ToolError, ToolResult};
use crate::types::{ContentBlock, ConversationMessage, ParticipantRole};
use serde_json::Value;
use std::collections::HashMap;

/// Registry of tools shared by an agent, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: HashMap<String, Tool>,
}

impl ToolSet {
    /// Build a set from tools; duplicate names are rejected eagerly
    pub fn new(tools: Vec<Tool>) -> Result<Self, ToolError> {
        let mut map = HashMap::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name().to_string();
            if map.insert(name.clone(), tool).is_some() {
                return Err(ToolError::DuplicateName(name));
            }
        }
        Ok(Self { tools: map })
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names, sorted for stable output
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Function-calling schemas for every registered tool, sorted by name
    pub fn schemas(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(Tool::to_schema)
            .collect()
    }

    /// Execute every tool-use block in a model response
    ///
    /// A response without content blocks is an error. Tool-use blocks naming
    /// an unregistered tool yield a literal not-found string as that call's
    /// result instead of failing the turn; handler errors propagate. All
    /// results are packaged into one user-role message of tool-result
    /// blocks, ready to be sent back to the model.
    pub async fn tool_handler(
        &self,
        response: &ConversationMessage,
    ) -> Result<ConversationMessage, ToolError> {
        if response.content.is_empty() {
            return Err(ToolError::NoContent);
        }

        let mut results = Vec::new();

        for block in &response.content {
            let (id, name, input) = match block {
                ContentBlock::ToolUse { id, name, input } => (id, name, input),
                _ => continue,
            };

            let content = match self.tools.get(name) {
                Some(tool) => tool.invoke(input.clone()).await?,
                None => Value::String(format!("Tool '{}' not found", name)),
            };

            results.push(ToolResult::new(id.clone(), content).to_block());
        }

        Ok(ConversationMessage::new(ParticipantRole::User, results))
    }
}
