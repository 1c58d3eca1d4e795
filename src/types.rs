//! Core conversation types shared across the crate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Sentinel agent id used in metadata when routing selected no agent
pub const NO_AGENT_SELECTED: &str = "no_agent_selected";

/// Sentinel agent name matching [`NO_AGENT_SELECTED`]
pub const NO_AGENT_NAME: &str = "No Agent";

/// Role of a participant in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    User,
    Assistant,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One block of message content
///
/// Messages carry a list of blocks rather than a plain string so that tool
/// calls and tool results can travel alongside text in the same structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Text content of this block, if it is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: ParticipantRole,
    pub content: Vec<ContentBlock>,
}

impl ConversationMessage {
    pub fn new(role: ParticipantRole, content: Vec<ContentBlock>) -> Self {
        Self { role, content }
    }

    /// A user message holding a single text block
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ParticipantRole::User, vec![ContentBlock::text(text)])
    }

    /// An assistant message holding a single text block
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(ParticipantRole::Assistant, vec![ContentBlock::text(text)])
    }

    /// First text block, empty string when the message has none
    pub fn first_text(&self) -> &str {
        self.content
            .iter()
            .find_map(|block| block.as_text())
            .unwrap_or("")
    }

    /// Tool-use blocks contained in this message
    pub fn tool_uses(&self) -> impl Iterator<Item = &ContentBlock> {
        self.content
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }
}

/// A conversation message paired with its creation time
///
/// Storage backends order history by this timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedMessage {
    #[serde(flatten)]
    pub message: ConversationMessage,
    pub timestamp: DateTime<Utc>,
}

impl TimestampedMessage {
    pub fn new(message: ConversationMessage) -> Self {
        Self {
            message,
            timestamp: Utc::now(),
        }
    }
}

impl From<ConversationMessage> for TimestampedMessage {
    fn from(message: ConversationMessage) -> Self {
        Self::new(message)
    }
}

/// Descriptive record of a routing outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    pub user_input: String,
    pub agent_id: String,
    pub agent_name: String,
    pub user_id: String,
    pub session_id: String,
    pub additional_params: HashMap<String, String>,
    /// Tag describing why routing degraded, absent on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// Structured result returned by `route_request`
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub metadata: RequestMetadata,
    pub output: ConversationMessage,
    pub streaming: bool,
}
