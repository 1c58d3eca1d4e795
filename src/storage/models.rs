//! Storage row models

use super::StorageError;
use crate::types::{ContentBlock, ConversationMessage, ParticipantRole};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One persisted chat message row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatRow {
    pub id: i64,
    pub message_id: String,
    pub user_id: String,
    pub session_id: String,
    pub agent_id: String,
    pub role: String,
    /// Content blocks serialized as JSON
    pub content: String,
    pub created_at: String,
}

impl ChatRow {
    /// Build an insertable row from a conversation message
    ///
    /// `id` is assigned by the database; the placeholder here is never
    /// written.
    pub fn from_message(
        user_id: &str,
        session_id: &str,
        agent_id: &str,
        message: &ConversationMessage,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            id: 0,
            message_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            agent_id: agent_id.to_string(),
            role: message.role.as_str().to_string(),
            content: serde_json::to_string(&message.content)?,
            created_at: Utc::now().to_rfc3339(),
        })
    }

    /// Reconstruct the conversation message from this row
    pub fn into_message(self) -> Result<ConversationMessage, StorageError> {
        let role = match self.role.as_str() {
            "user" => ParticipantRole::User,
            "assistant" => ParticipantRole::Assistant,
            other => {
                return Err(StorageError::Corrupt(format!(
                    "unknown role '{}' in row {}",
                    other, self.message_id
                )))
            }
        };

        let content: Vec<ContentBlock> = serde_json::from_str(&self.content)?;

        Ok(ConversationMessage::new(role, content))
    }
}
