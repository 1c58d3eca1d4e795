//! End-to-end routing tests using mock providers, classifiers and storage

use async_trait::async_trait;
use conductor::agent::{
    Agent, AgentOptions, ChatMessage, Completion, CompletionProvider, CompletionRequest,
    ProviderError, TokenStream,
};
use conductor::classifier::{Classifier, ClassifierError, ClassifierResult};
use conductor::config::OrchestratorConfig;
use conductor::orchestrator::{MultiAgentOrchestrator, OrchestratorError};
use conductor::storage::{ChatStorage, InMemoryChatStorage, StorageError};
use conductor::types::{ConversationMessage, NO_AGENT_NAME, NO_AGENT_SELECTED};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Provider replying "echo: <last user message>"
struct EchoProvider;

#[async_trait]
impl CompletionProvider for EchoProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(Completion {
            content: Some(format!("echo: {}", last_user)),
            model: "echo".to_string(),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn complete_stream(
        &self,
        _request: CompletionRequest,
    ) -> Result<TokenStream, ProviderError> {
        Err(ProviderError::ModelError("echo provider is not streaming".to_string()))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

/// Provider failing every request
struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ProviderError> {
        Err(ProviderError::ConnectionError("backend unreachable".to_string()))
    }

    async fn complete_stream(
        &self,
        _request: CompletionRequest,
    ) -> Result<TokenStream, ProviderError> {
        Err(ProviderError::ConnectionError("backend unreachable".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Classifier always picking the agent registered under `target_id`
struct ScriptedClassifier {
    target_id: String,
    agents: HashMap<String, Arc<Agent>>,
}

impl ScriptedClassifier {
    fn targeting(target_id: &str) -> Self {
        Self {
            target_id: target_id.to_string(),
            agents: HashMap::new(),
        }
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    fn set_agents(&mut self, agents: &HashMap<String, Arc<Agent>>) {
        self.agents = agents.clone();
    }

    async fn classify(
        &self,
        _input: &str,
        _user_id: &str,
        _session_id: &str,
    ) -> Result<ClassifierResult, ClassifierError> {
        Ok(match self.agents.get(&self.target_id) {
            Some(agent) => ClassifierResult::selected(agent.clone(), 1.0),
            None => ClassifierResult::none(),
        })
    }
}

/// Classifier failing every request
struct BrokenClassifier;

#[async_trait]
impl Classifier for BrokenClassifier {
    fn set_agents(&mut self, _agents: &HashMap<String, Arc<Agent>>) {}

    async fn classify(
        &self,
        _input: &str,
        _user_id: &str,
        _session_id: &str,
    ) -> Result<ClassifierResult, ClassifierError> {
        Err(ClassifierError::Failed("model offline".to_string()))
    }
}

/// Storage counting save calls, delegating to the in-memory backend
struct CountingStorage {
    inner: InMemoryChatStorage,
    saves: AtomicUsize,
}

impl CountingStorage {
    fn new() -> Self {
        Self {
            inner: InMemoryChatStorage::new(),
            saves: AtomicUsize::new(0),
        }
    }

    fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatStorage for CountingStorage {
    async fn fetch_chat(
        &self,
        user_id: &str,
        session_id: &str,
        agent_id: &str,
    ) -> Result<Vec<ConversationMessage>, StorageError> {
        self.inner.fetch_chat(user_id, session_id, agent_id).await
    }

    async fn save_chat_message(
        &self,
        user_id: &str,
        session_id: &str,
        agent_id: &str,
        message: ConversationMessage,
        max_pairs: usize,
    ) -> Result<(), StorageError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner
            .save_chat_message(user_id, session_id, agent_id, message, max_pairs)
            .await
    }
}

fn echo_agent(name: &str, description: &str) -> Agent {
    Agent::new(AgentOptions::new(name, description, Arc::new(EchoProvider)))
}

fn orchestrator_with(
    config: OrchestratorConfig,
    classifier: Box<dyn Classifier>,
    storage: Arc<CountingStorage>,
) -> MultiAgentOrchestrator {
    MultiAgentOrchestrator::new(config, classifier, storage).unwrap()
}

#[tokio::test]
async fn test_routes_to_selected_agent_and_persists_exchange() {
    let storage = Arc::new(CountingStorage::new());
    let mut orchestrator = orchestrator_with(
        OrchestratorConfig::default(),
        Box::new(ScriptedClassifier::targeting("tech-agent")),
        storage.clone(),
    );
    orchestrator
        .add_agent(echo_agent("Tech Agent", "Software questions"))
        .unwrap();

    let response = orchestrator
        .route_request("how do I fix this?", "u1", "s1", HashMap::new())
        .await;

    assert_eq!(response.metadata.agent_id, "tech-agent");
    assert_eq!(response.metadata.agent_name, "Tech Agent");
    assert_eq!(response.metadata.error_type, None);
    assert_eq!(response.output.first_text(), "echo: how do I fix this?");
    assert!(!response.streaming);

    // User turn plus the reply
    assert_eq!(storage.save_count(), 2);
    let history = storage.fetch_chat("u1", "s1", "tech-agent").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].first_text(), "how do I fix this?");
    assert_eq!(history[1].first_text(), "echo: how do I fix this?");
}

#[tokio::test]
async fn test_duplicate_agent_id_is_rejected_and_registry_unchanged() {
    let storage = Arc::new(CountingStorage::new());
    let mut orchestrator = orchestrator_with(
        OrchestratorConfig::default(),
        Box::new(ScriptedClassifier::targeting("tech-agent")),
        storage,
    );

    orchestrator
        .add_agent(echo_agent("Tech Agent", "First registration"))
        .unwrap();
    let result = orchestrator.add_agent(echo_agent("Tech   Agent!", "Same derived id"));

    assert!(matches!(
        result,
        Err(OrchestratorError::DuplicateAgentId(id)) if id == "tech-agent"
    ));
    let agents = orchestrator.all_agents();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].2, "First registration");
}

#[tokio::test]
async fn test_no_agent_selected_returns_configured_message_without_saves() {
    let storage = Arc::new(CountingStorage::new());
    let mut config = OrchestratorConfig::default();
    config.use_default_agent_if_none_identified = false;
    let expected = config.no_selected_agent_message.clone();

    let mut orchestrator = orchestrator_with(
        config,
        Box::new(ScriptedClassifier::targeting("nobody")),
        storage.clone(),
    );
    orchestrator
        .add_agent(echo_agent("Tech Agent", "Software questions"))
        .unwrap();

    let response = orchestrator
        .route_request("hello", "u1", "s1", HashMap::new())
        .await;

    assert_eq!(response.output.first_text(), expected);
    assert_eq!(response.metadata.agent_id, NO_AGENT_SELECTED);
    assert_eq!(response.metadata.agent_name, NO_AGENT_NAME);
    assert_eq!(
        response.metadata.error_type.as_deref(),
        Some("classification_failed")
    );
    assert_eq!(storage.save_count(), 0);
}

#[tokio::test]
async fn test_default_agent_handles_unclassified_requests() {
    let storage = Arc::new(CountingStorage::new());
    let mut orchestrator = orchestrator_with(
        OrchestratorConfig::default(),
        Box::new(ScriptedClassifier::targeting("nobody")),
        storage,
    );
    let fallback = orchestrator
        .add_agent(echo_agent("Generalist", "Handles anything"))
        .unwrap();
    orchestrator.set_default_agent(fallback);

    let response = orchestrator
        .route_request("hello", "u1", "s1", HashMap::new())
        .await;

    assert_eq!(response.metadata.agent_id, "generalist");
    assert_eq!(response.output.first_text(), "echo: hello");
}

#[tokio::test]
async fn test_agent_failure_downgrades_to_error_response() {
    let storage = Arc::new(CountingStorage::new());
    let mut config = OrchestratorConfig::default();
    config.general_routing_error_message = Some("Something went wrong, try again.".to_string());

    let mut orchestrator = orchestrator_with(
        config,
        Box::new(ScriptedClassifier::targeting("broken-agent")),
        storage.clone(),
    );
    orchestrator
        .add_agent(Agent::new(AgentOptions::new(
            "Broken Agent",
            "Always fails",
            Arc::new(FailingProvider),
        )))
        .unwrap();

    let response = orchestrator
        .route_request("hello", "u1", "s1", HashMap::new())
        .await;

    assert_eq!(response.output.first_text(), "Something went wrong, try again.");
    assert_eq!(response.metadata.agent_id, NO_AGENT_SELECTED);
    assert_eq!(
        response.metadata.error_type.as_deref(),
        Some("classification_failed")
    );
    // Nothing persisted for a failed exchange
    assert_eq!(storage.save_count(), 0);
}

#[tokio::test]
async fn test_classifier_failure_downgrades_to_error_response() {
    let storage = Arc::new(CountingStorage::new());
    let mut config = OrchestratorConfig::default();
    config.classification_error_message = Some("Could not understand the request.".to_string());

    let mut orchestrator = orchestrator_with(config, Box::new(BrokenClassifier), storage);
    orchestrator
        .add_agent(echo_agent("Tech Agent", "Software questions"))
        .unwrap();

    let response = orchestrator
        .route_request("hello", "u1", "s1", HashMap::new())
        .await;

    assert_eq!(response.output.first_text(), "Could not understand the request.");
    assert_eq!(
        response.metadata.error_type.as_deref(),
        Some("classification_failed")
    );
}

#[tokio::test]
async fn test_execution_times_recorded_when_enabled() {
    let storage = Arc::new(CountingStorage::new());
    let mut config = OrchestratorConfig::default();
    config.log_execution_times = true;

    let mut orchestrator = orchestrator_with(
        config,
        Box::new(ScriptedClassifier::targeting("tech-agent")),
        storage,
    );
    orchestrator
        .add_agent(echo_agent("Tech Agent", "Software questions"))
        .unwrap();

    orchestrator
        .route_request("hello", "u1", "s1", HashMap::new())
        .await;

    let times = orchestrator.execution_times();
    assert!(times.contains_key("Classifying user intent"));
    assert!(times.contains_key("Agent Tech Agent | Processing request"));
    assert!(times.values().all(|seconds| *seconds >= 0.0));
}

#[tokio::test]
async fn test_execution_times_cleared_per_request_and_empty_when_disabled() {
    let storage = Arc::new(CountingStorage::new());
    let mut orchestrator = orchestrator_with(
        OrchestratorConfig::default(),
        Box::new(ScriptedClassifier::targeting("tech-agent")),
        storage,
    );
    orchestrator
        .add_agent(echo_agent("Tech Agent", "Software questions"))
        .unwrap();

    orchestrator
        .route_request("hello", "u1", "s1", HashMap::new())
        .await;

    assert!(orchestrator.execution_times().is_empty());
}

#[tokio::test]
async fn test_save_chat_disabled_skips_persistence() {
    let storage = Arc::new(CountingStorage::new());
    let mut orchestrator = orchestrator_with(
        OrchestratorConfig::default(),
        Box::new(ScriptedClassifier::targeting("ephemeral")),
        storage.clone(),
    );
    orchestrator
        .add_agent(Agent::new(
            AgentOptions::new("Ephemeral", "Leaves no trace", Arc::new(EchoProvider))
                .with_save_chat(false),
        ))
        .unwrap();

    let response = orchestrator
        .route_request("hello", "u1", "s1", HashMap::new())
        .await;

    assert_eq!(response.output.first_text(), "echo: hello");
    assert_eq!(storage.save_count(), 0);
}

#[tokio::test]
async fn test_additional_params_flow_into_metadata() {
    let storage = Arc::new(CountingStorage::new());
    let mut orchestrator = orchestrator_with(
        OrchestratorConfig::default(),
        Box::new(ScriptedClassifier::targeting("tech-agent")),
        storage,
    );
    orchestrator
        .add_agent(echo_agent("Tech Agent", "Software questions"))
        .unwrap();

    let mut params = HashMap::new();
    params.insert("locale".to_string(), "es-CL".to_string());

    let response = orchestrator
        .route_request("hello", "u1", "s1", params)
        .await;

    assert_eq!(
        response.metadata.additional_params.get("locale").map(String::as_str),
        Some("es-CL")
    );
    assert_eq!(response.metadata.user_input, "hello");
    assert_eq!(response.metadata.user_id, "u1");
    assert_eq!(response.metadata.session_id, "s1");
}

#[tokio::test]
async fn test_chat_history_reaches_the_provider() {
    let storage = Arc::new(CountingStorage::new());
    storage
        .save_chat_message(
            "u1",
            "s1",
            "tech-agent",
            ConversationMessage::user("earlier question"),
            10,
        )
        .await
        .unwrap();
    storage
        .save_chat_message(
            "u1",
            "s1",
            "tech-agent",
            ConversationMessage::assistant("earlier answer"),
            10,
        )
        .await
        .unwrap();

    /// Provider asserting the prior turns are present in the request
    struct HistoryCheckingProvider;

    #[async_trait]
    impl CompletionProvider for HistoryCheckingProvider {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
            let contents: Vec<&str> = request
                .messages
                .iter()
                .map(|m: &ChatMessage| m.content.as_str())
                .collect();
            assert!(contents.contains(&"earlier question"));
            assert!(contents.contains(&"earlier answer"));
            Ok(Completion {
                content: Some("ok".to_string()),
                model: "checker".to_string(),
                finish_reason: None,
            })
        }

        async fn complete_stream(
            &self,
            _request: CompletionRequest,
        ) -> Result<TokenStream, ProviderError> {
            Err(ProviderError::ModelError("not streaming".to_string()))
        }

        fn model_name(&self) -> &str {
            "checker"
        }
    }

    let mut orchestrator = orchestrator_with(
        OrchestratorConfig::default(),
        Box::new(ScriptedClassifier::targeting("tech-agent")),
        storage,
    );
    orchestrator
        .add_agent(Agent::new(AgentOptions::new(
            "Tech Agent",
            "Software questions",
            Arc::new(HistoryCheckingProvider),
        )))
        .unwrap();

    let response = orchestrator
        .route_request("follow-up question", "u1", "s1", HashMap::new())
        .await;

    assert_eq!(response.metadata.error_type, None);
    assert_eq!(response.output.first_text(), "ok");
}
