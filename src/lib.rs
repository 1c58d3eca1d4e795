//! Conductor: a multi-agent orchestration core
//!
//! A host application registers [`agent::Agent`]s with a
//! [`orchestrator::MultiAgentOrchestrator`], which classifies each user
//! request, dispatches it to the selected agent and persists the exchange.
//!
//! ```no_run
//! use conductor::agent::{Agent, AgentOptions};
//! use conductor::classifier::KeywordClassifier;
//! use conductor::config::OrchestratorConfig;
//! use conductor::orchestrator::MultiAgentOrchestrator;
//! use conductor::storage::InMemoryChatStorage;
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! # async fn run(provider: Arc<dyn conductor::agent::CompletionProvider>) -> anyhow::Result<()> {
//! let config = OrchestratorConfig::default();
//! let storage = Arc::new(InMemoryChatStorage::new());
//! let mut orchestrator = MultiAgentOrchestrator::new(
//!     config,
//!     Box::new(KeywordClassifier::new()),
//!     storage,
//! )?;
//!
//! orchestrator.add_agent(Agent::new(AgentOptions::new(
//!     "Tech Agent",
//!     "Answers questions about software and hardware",
//!     provider,
//! )))?;
//!
//! let response = orchestrator
//!     .route_request("How do I patch a kernel?", "user-1", "session-1", HashMap::new())
//!     .await;
//! println!("{}", response.output.first_text());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod classifier;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod storage;
pub mod tools;
pub mod types;

pub use agent::{Agent, AgentOptions};
pub use classifier::{Classifier, ClassifierResult, KeywordClassifier};
pub use config::OrchestratorConfig;
pub use orchestrator::MultiAgentOrchestrator;
pub use storage::{ChatStorage, InMemoryChatStorage, SqliteChatStorage};
pub use tools::{Tool, ToolSet};
pub use types::{AgentResponse, ConversationMessage, RequestMetadata};
