//! SQLite-backed chat storage

use super::migrations::INIT_SCHEMA;
use super::models::ChatRow;
use super::{ChatStorage, StorageError};
use crate::log_debug;
use crate::types::ConversationMessage;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Chat history persisted in a SQLite database
///
/// Trimming happens on every insert, so the table never holds more than
/// `max_pairs * 2` rows per (user, session, agent) conversation.
pub struct SqliteChatStorage {
    pool: SqlitePool,
}

impl SqliteChatStorage {
    /// Open (or create) the database at `path` and run migrations
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// In-memory database, used by tests
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(INIT_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        log_debug!("Chat schema ready");
        Ok(())
    }
}

#[async_trait]
impl ChatStorage for SqliteChatStorage {
    async fn fetch_chat(
        &self,
        user_id: &str,
        session_id: &str,
        agent_id: &str,
    ) -> Result<Vec<ConversationMessage>, StorageError> {
        let rows: Vec<ChatRow> = sqlx::query_as(
            "SELECT id, message_id, user_id, session_id, agent_id, role, content, created_at
             FROM chat_messages
             WHERE user_id = ? AND session_id = ? AND agent_id = ?
             ORDER BY id ASC",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChatRow::into_message).collect()
    }

    async fn save_chat_message(
        &self,
        user_id: &str,
        session_id: &str,
        agent_id: &str,
        message: ConversationMessage,
        max_pairs: usize,
    ) -> Result<(), StorageError> {
        let row = ChatRow::from_message(user_id, session_id, agent_id, &message)?;

        sqlx::query(
            "INSERT INTO chat_messages
                 (message_id, user_id, session_id, agent_id, role, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.message_id)
        .bind(&row.user_id)
        .bind(&row.session_id)
        .bind(&row.agent_id)
        .bind(&row.role)
        .bind(&row.content)
        .bind(&row.created_at)
        .execute(&self.pool)
        .await?;

        // Drop the oldest rows beyond the retention window
        let keep = (max_pairs * 2) as i64;
        sqlx::query(
            "DELETE FROM chat_messages
             WHERE user_id = ? AND session_id = ? AND agent_id = ?
               AND id NOT IN (
                   SELECT id FROM chat_messages
                   WHERE user_id = ? AND session_id = ? AND agent_id = ?
                   ORDER BY id DESC
                   LIMIT ?
               )",
        )
        .bind(user_id)
        .bind(session_id)
        .bind(agent_id)
        .bind(user_id)
        .bind(session_id)
        .bind(agent_id)
        .bind(keep)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
