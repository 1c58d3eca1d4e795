//! Multi-agent orchestrator: classify, dispatch, persist
//!
//! [`MultiAgentOrchestrator`] owns the agent registry and routes each user
//! request through a [`Classifier`] to the selected [`Agent`], persisting
//! the exchange through a [`ChatStorage`] backend. Routing never panics
//! and never returns an error: failures are downgraded to a plain reply
//! carrying an `error_type` tag in its metadata.

mod diagnostics;

pub use diagnostics::Diagnostics;

use crate::agent::Agent;
use crate::classifier::Classifier;
use crate::config::{ConfigError, OrchestratorConfig};
use crate::storage::ChatStorage;
use crate::types::{
    AgentResponse, ConversationMessage, RequestMetadata, NO_AGENT_NAME, NO_AGENT_SELECTED,
};
use crate::{log_error, log_info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Orchestrator errors
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("An agent with id '{0}' is already registered")]
    DuplicateAgentId(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Error tag attached whenever routing ended without a selected agent,
/// whether classification produced nothing or a later step failed
const ERROR_CLASSIFICATION: &str = "classification_failed";

/// Routes user requests to registered agents
///
/// Construction takes the collaborators explicitly; there are no globals.
/// `route_request` is `&mut self` because per-request execution timings
/// are recorded on the orchestrator.
pub struct MultiAgentOrchestrator {
    config: OrchestratorConfig,
    classifier: Box<dyn Classifier>,
    storage: Arc<dyn ChatStorage>,
    diagnostics: Diagnostics,
    agents: HashMap<String, Arc<Agent>>,
    default_agent: Option<Arc<Agent>>,
    execution_times: HashMap<String, f64>,
}

impl MultiAgentOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        classifier: Box<dyn Classifier>,
        storage: Arc<dyn ChatStorage>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let diagnostics = Diagnostics::new(&config);

        Ok(Self {
            config,
            classifier,
            storage,
            diagnostics,
            agents: HashMap::new(),
            default_agent: None,
            execution_times: HashMap::new(),
        })
    }

    /// Register an agent under its derived id
    ///
    /// The registry is unchanged when the id is already taken. On success
    /// the classifier is handed the updated candidate set.
    pub fn add_agent(&mut self, agent: Agent) -> Result<Arc<Agent>, OrchestratorError> {
        let id = agent.id().to_string();
        if self.agents.contains_key(&id) {
            return Err(OrchestratorError::DuplicateAgentId(id));
        }

        let agent = Arc::new(agent);
        self.agents.insert(id.clone(), Arc::clone(&agent));
        self.classifier.set_agents(&self.agents);
        log_info!("Registered agent '{}' ({})", agent.name(), id);

        Ok(agent)
    }

    /// Agent used when classification selects nothing, honoring
    /// `use_default_agent_if_none_identified`
    pub fn set_default_agent(&mut self, agent: Arc<Agent>) {
        self.default_agent = Some(agent);
    }

    /// Registered agents as (id, name, description) tuples
    pub fn all_agents(&self) -> Vec<(String, String, String)> {
        let mut listed: Vec<_> = self
            .agents
            .values()
            .map(|agent| {
                (
                    agent.id().to_string(),
                    agent.name().to_string(),
                    agent.description().to_string(),
                )
            })
            .collect();
        listed.sort_by(|a, b| a.0.cmp(&b.0));
        listed
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<&Arc<Agent>> {
        self.agents.get(agent_id)
    }

    /// Diagnostic sink for this orchestrator's config; classifier
    /// implementations log their chat history and raw output through it
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Timings recorded by the most recent `route_request` call, in
    /// seconds; empty when `log_execution_times` is disabled
    pub fn execution_times(&self) -> &HashMap<String, f64> {
        &self.execution_times
    }

    /// Route one user request end to end
    ///
    /// Clears previous timings, classifies the input, dispatches to the
    /// selected (or default) agent and persists the exchange. Every
    /// failure path yields a normal [`AgentResponse`] with `error_type`
    /// set in its metadata.
    pub async fn route_request(
        &mut self,
        user_input: &str,
        user_id: &str,
        session_id: &str,
        additional_params: HashMap<String, String>,
    ) -> AgentResponse {
        self.execution_times.clear();

        let started = Instant::now();
        let classification = self
            .classifier
            .classify(user_input, user_id, session_id)
            .await;
        self.record_time("Classifying user intent", started);

        let response = match classification {
            Err(error) => {
                log_error!("Classification failed: {}", error);
                let reply = self
                    .config
                    .classification_error_message
                    .clone()
                    .unwrap_or_else(|| error.to_string());
                self.fallback_response(user_input, user_id, session_id, &additional_params, reply)
            }
            Ok(result) => {
                self.diagnostics.log_classifier_output(
                    &format!("{:?}", result),
                    false,
                );

                let selected = result.selected_agent.or_else(|| {
                    if self.config.use_default_agent_if_none_identified {
                        self.default_agent.clone()
                    } else {
                        None
                    }
                });

                match selected {
                    None => {
                        log_info!("No agent selected for user {} session {}", user_id, session_id);
                        self.fallback_response(
                            user_input,
                            user_id,
                            session_id,
                            &additional_params,
                            self.config.no_selected_agent_message.clone(),
                        )
                    }
                    Some(agent) => {
                        match self
                            .dispatch_to_agent(
                                &agent,
                                user_input,
                                user_id,
                                session_id,
                                &additional_params,
                            )
                            .await
                        {
                            Ok(response) => response,
                            Err(error) => {
                                log_error!(
                                    "Routing to agent '{}' failed: {:#}",
                                    agent.id(),
                                    error
                                );
                                let reply = self
                                    .config
                                    .general_routing_error_message
                                    .clone()
                                    .unwrap_or_else(|| error.to_string());
                                self.fallback_response(
                                    user_input,
                                    user_id,
                                    session_id,
                                    &additional_params,
                                    reply,
                                )
                            }
                        }
                    }
                }
            }
        };

        self.diagnostics.print_execution_times(&self.execution_times);
        response
    }

    async fn dispatch_to_agent(
        &mut self,
        agent: &Arc<Agent>,
        user_input: &str,
        user_id: &str,
        session_id: &str,
        additional_params: &HashMap<String, String>,
    ) -> anyhow::Result<AgentResponse> {
        let chat_history = self
            .storage
            .fetch_chat(user_id, session_id, agent.id())
            .await?;

        self.diagnostics
            .print_chat_history(&chat_history, Some(agent.id()));

        let label = format!("Agent {} | Processing request", agent.name());
        let started = Instant::now();
        let outcome = agent
            .process_request(user_input, user_id, session_id, &chat_history, additional_params)
            .await;
        self.record_time(&label, started);

        let reply = outcome?;

        if agent.save_chat() {
            self.storage
                .save_chat_message(
                    user_id,
                    session_id,
                    agent.id(),
                    ConversationMessage::user(user_input),
                    self.config.max_message_pairs_per_agent,
                )
                .await?;
            self.storage
                .save_chat_message(
                    user_id,
                    session_id,
                    agent.id(),
                    reply.clone(),
                    self.config.max_message_pairs_per_agent,
                )
                .await?;
        }

        let metadata = self.create_metadata(
            user_input,
            agent.id(),
            agent.name(),
            user_id,
            session_id,
            additional_params,
            None,
        );

        Ok(AgentResponse {
            metadata,
            output: reply,
            streaming: agent.is_streaming_enabled(),
        })
    }

    /// Degraded reply for every path that ends without a selected agent;
    /// metadata carries the sentinels and the classification-failed tag
    fn fallback_response(
        &self,
        user_input: &str,
        user_id: &str,
        session_id: &str,
        additional_params: &HashMap<String, String>,
        reply: String,
    ) -> AgentResponse {
        let metadata = self.create_metadata(
            user_input,
            NO_AGENT_SELECTED,
            NO_AGENT_NAME,
            user_id,
            session_id,
            additional_params,
            Some(ERROR_CLASSIFICATION.to_string()),
        );

        AgentResponse {
            metadata,
            output: ConversationMessage::assistant(reply),
            streaming: false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn create_metadata(
        &self,
        user_input: &str,
        agent_id: &str,
        agent_name: &str,
        user_id: &str,
        session_id: &str,
        additional_params: &HashMap<String, String>,
        error_type: Option<String>,
    ) -> RequestMetadata {
        RequestMetadata {
            user_input: user_input.to_string(),
            agent_id: agent_id.to_string(),
            agent_name: agent_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            additional_params: additional_params.clone(),
            error_type,
        }
    }

    fn record_time(&mut self, label: &str, started: Instant) {
        if !self.config.log_execution_times {
            return;
        }
        let seconds = started.elapsed().as_secs_f64();
        self.execution_times.insert(label.to_string(), seconds);
    }
}
