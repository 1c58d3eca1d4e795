//! Classifier seam: maps a user request to a selected agent
//!
//! The orchestrator consults a [`Classifier`] on every routed request. The
//! crate ships [`KeywordClassifier`], a heuristic implementation scoring
//! keyword overlap between the input and each agent's name and description;
//! hosts with an LLM-backed classifier implement the trait themselves.

mod keyword;

pub use keyword::KeywordClassifier;

use crate::agent::Agent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Classifier errors
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Classification failed: {0}")]
    Failed(String),

    #[error("Invalid classifier output: {0}")]
    InvalidOutput(String),
}

/// Outcome of classifying one request
#[derive(Clone)]
pub struct ClassifierResult {
    /// None when no agent matched the request
    pub selected_agent: Option<Arc<Agent>>,
    pub confidence: f64,
}

impl ClassifierResult {
    pub fn none() -> Self {
        Self {
            selected_agent: None,
            confidence: 0.0,
        }
    }

    pub fn selected(agent: Arc<Agent>, confidence: f64) -> Self {
        Self {
            selected_agent: Some(agent),
            confidence,
        }
    }
}

impl std::fmt::Debug for ClassifierResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierResult")
            .field(
                "selected_agent",
                &self.selected_agent.as_ref().map(|a| a.id()),
            )
            .field("confidence", &self.confidence)
            .finish()
    }
}

/// Maps a user request to one of the registered agents
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Replace the candidate agent set; called on every registration
    fn set_agents(&mut self, agents: &HashMap<String, Arc<Agent>>);

    /// Select an agent for the input, or none
    async fn classify(
        &self,
        input: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<ClassifierResult, ClassifierError>;
}
