//! In-memory chat storage

use super::{ChatStorage, StorageError};
use crate::types::{ConversationMessage, TimestampedMessage};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

type ConversationKey = (String, String, String);

/// Map-backed storage, the default for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct InMemoryChatStorage {
    conversations: Mutex<HashMap<ConversationKey, Vec<TimestampedMessage>>>,
}

impl InMemoryChatStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(user_id: &str, session_id: &str, agent_id: &str) -> ConversationKey {
        (
            user_id.to_string(),
            session_id.to_string(),
            agent_id.to_string(),
        )
    }
}

#[async_trait]
impl ChatStorage for InMemoryChatStorage {
    async fn fetch_chat(
        &self,
        user_id: &str,
        session_id: &str,
        agent_id: &str,
    ) -> Result<Vec<ConversationMessage>, StorageError> {
        let conversations = self.conversations.lock().await;
        Ok(conversations
            .get(&Self::key(user_id, session_id, agent_id))
            .map(|messages| messages.iter().map(|m| m.message.clone()).collect())
            .unwrap_or_default())
    }

    async fn save_chat_message(
        &self,
        user_id: &str,
        session_id: &str,
        agent_id: &str,
        message: ConversationMessage,
        max_pairs: usize,
    ) -> Result<(), StorageError> {
        let mut conversations = self.conversations.lock().await;
        let messages = conversations
            .entry(Self::key(user_id, session_id, agent_id))
            .or_default();

        messages.push(TimestampedMessage::new(message));

        // A pair is one user turn plus one assistant turn
        let max_messages = max_pairs.saturating_mul(2);
        if messages.len() > max_messages {
            let excess = messages.len() - max_messages;
            messages.drain(..excess);
        }

        Ok(())
    }
}
