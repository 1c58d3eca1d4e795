//! Chat history persistence
//!
//! Conversations are append-only per (user, session, agent) tuple and
//! trimmed to the most recent `max_pairs` user/assistant pairs on save.
//! Two backends ship with the crate: an in-memory map for tests and
//! ephemeral use, and a SQLite store.

mod memory;
mod migrations;
mod models;
mod sqlite;

pub use memory::InMemoryChatStorage;
pub use models::ChatRow;
pub use sqlite::SqliteChatStorage;

use crate::types::ConversationMessage;
use async_trait::async_trait;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Chat history store consumed by the orchestrator
#[async_trait]
pub trait ChatStorage: Send + Sync {
    /// Fetch the conversation for a (user, session, agent) tuple, oldest
    /// first
    async fn fetch_chat(
        &self,
        user_id: &str,
        session_id: &str,
        agent_id: &str,
    ) -> Result<Vec<ConversationMessage>, StorageError>;

    /// Append one message, trimming the conversation to `max_pairs`
    /// user/assistant pairs
    async fn save_chat_message(
        &self,
        user_id: &str,
        session_id: &str,
        agent_id: &str,
        message: ConversationMessage,
        max_pairs: usize,
    ) -> Result<(), StorageError>;
}
