//! Context retriever seam
//!
//! Agents may carry a retriever whose combined results are appended to the
//! system prompt before each completion.

use async_trait::async_trait;
use thiserror::Error;

/// Retriever failure, surfaced through the agent as a fatal request error
#[derive(Error, Debug)]
#[error("Retrieval failed: {0}")]
pub struct RetrieverError(pub String);

/// Context retriever consulted per request
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve context relevant to the query, combined into one string
    async fn retrieve_and_combine_results(&self, query: &str) -> Result<String, RetrieverError>;
}
