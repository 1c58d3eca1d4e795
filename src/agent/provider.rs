//! Completion provider abstraction
//!
//! The orchestrator never talks to a vendor API directly; callers supply an
//! implementation of [`CompletionProvider`] for whatever backend they use.
//! Both single-shot and streaming completions are part of the contract.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Model error: {0}")]
    ModelError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A role-tagged chat message in the provider wire shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A completion request: message list plus generation parameters
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    pub stream: bool,
    /// Function-calling tool schemas, absent when the agent has no tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
}

/// A finished completion
#[derive(Debug, Clone)]
pub struct Completion {
    /// Assistant text, None when the model produced no content
    pub content: Option<String>,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// Incremental token stream for streaming completions
pub type TokenStream = BoxStream<'static, Result<String, ProviderError>>;

/// Model completion provider
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a full completion for the request
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;

    /// Generate a completion as an incremental token stream
    async fn complete_stream(
        &self,
        request: CompletionRequest,
    ) -> Result<TokenStream, ProviderError>;

    /// Get the model name
    fn model_name(&self) -> &str;
}
