//! Agent: a configured persona answering one turn at a time

use super::provider::{ChatMessage, CompletionProvider, CompletionRequest, ProviderError};
use super::retriever::{Retriever, RetrieverError};
use super::streaming::{accumulate, TokenCallback};
use crate::config::InferenceConfig;
use crate::log_error;
use crate::tools::ToolSet;
use crate::types::ConversationMessage;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Completion provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Retriever(#[from] RetrieverError),

    #[error("Model returned no content")]
    EmptyCompletion,
}

/// Default system prompt template, interpolated with the agent's
/// name and description
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You are a {{name}}. {{description}} \
Provide helpful and accurate information based on your expertise. \
You will engage in an open-ended conversation: the human may ask questions \
on any topic, follow up on your previous response, or switch to an \
unrelated subject at any point. Understand the context and intent behind \
each prompt, answer it directly, ask for clarification when a prompt is \
ambiguous, and keep a consistent and respectful tone throughout.";

/// A template variable: a single value or a list joined with newlines
#[derive(Debug, Clone)]
pub enum TemplateValue {
    Single(String),
    Many(Vec<String>),
}

impl TemplateValue {
    fn render(&self) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Many(values) => values.join("\n"),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

/// Variables available to `{{placeholder}}` substitution
pub type TemplateVariables = HashMap<String, TemplateValue>;

lazy_static! {
    static ref KEY_STRIP_RE: Regex = Regex::new(r"[^a-zA-Z0-9\s-]").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{\{(\w+)\}\}").unwrap();
}

/// Derive a slug id from an agent name
///
/// Strips everything but alphanumerics, whitespace and hyphens, collapses
/// whitespace runs to a single hyphen and lowercases. Idempotent.
pub fn generate_key_from_name(name: &str) -> String {
    let stripped = KEY_STRIP_RE.replace_all(name, "");
    let hyphenated = WHITESPACE_RE.replace_all(stripped.trim(), "-");
    hyphenated.to_lowercase()
}

/// Substitute `{{key}}` placeholders; unknown keys are left untouched
pub fn replace_placeholders(template: &str, variables: &TemplateVariables) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match variables.get(&caps[1]) {
                Some(value) => value.render(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Construction options for an [`Agent`]
#[derive(Clone)]
pub struct AgentOptions {
    pub name: String,
    pub description: String,
    pub provider: Arc<dyn CompletionProvider>,
    pub streaming: bool,
    pub inference: InferenceConfig,
    pub tools: Option<Arc<ToolSet>>,
    pub retriever: Option<Arc<dyn Retriever>>,
    /// Persist this agent's exchanges through the orchestrator's storage
    pub save_chat: bool,
    /// Invoked once per streamed token when streaming is enabled
    pub on_token: Option<TokenCallback>,
    /// Overrides [`DEFAULT_PROMPT_TEMPLATE`]
    pub prompt_template: Option<String>,
}

impl AgentOptions {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            provider,
            streaming: false,
            inference: InferenceConfig::default(),
            tools: None,
            retriever: None,
            save_chat: true,
            on_token: None,
            prompt_template: None,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolSet>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_save_chat(mut self, save_chat: bool) -> Self {
        self.save_chat = save_chat;
        self
    }

    pub fn with_token_callback(mut self, callback: TokenCallback) -> Self {
        self.on_token = Some(callback);
        self
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }
}

/// A persona bound to a model and an optional tool set
pub struct Agent {
    id: String,
    name: String,
    description: String,
    provider: Arc<dyn CompletionProvider>,
    streaming: bool,
    inference: InferenceConfig,
    tools: Option<Arc<ToolSet>>,
    retriever: Option<Arc<dyn Retriever>>,
    save_chat: bool,
    on_token: Option<TokenCallback>,
    prompt_template: String,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("streaming", &self.streaming)
            .field("save_chat", &self.save_chat)
            .finish()
    }
}

impl Agent {
    pub fn new(options: AgentOptions) -> Self {
        let id = generate_key_from_name(&options.name);
        Self {
            id,
            name: options.name,
            description: options.description,
            provider: options.provider,
            streaming: options.streaming,
            inference: options.inference,
            tools: options.tools,
            retriever: options.retriever,
            save_chat: options.save_chat,
            on_token: options.on_token,
            prompt_template: options
                .prompt_template
                .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_streaming_enabled(&self) -> bool {
        self.streaming
    }

    pub fn save_chat(&self) -> bool {
        self.save_chat
    }

    pub fn tools(&self) -> Option<&Arc<ToolSet>> {
        self.tools.as_ref()
    }

    /// Token used to cancel an in-flight streaming response
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Render the system prompt from the template
    pub fn system_prompt(&self) -> String {
        let mut variables = TemplateVariables::new();
        variables.insert("name".to_string(), self.name.as_str().into());
        variables.insert("description".to_string(), self.description.as_str().into());
        replace_placeholders(&self.prompt_template, &variables)
    }

    /// Answer one user turn given prior history
    ///
    /// Provider failures are logged and re-raised; there is no retry and
    /// no fallback at this level.
    pub async fn process_request(
        &self,
        input_text: &str,
        user_id: &str,
        session_id: &str,
        chat_history: &[ConversationMessage],
        _additional_params: &HashMap<String, String>,
    ) -> Result<ConversationMessage, AgentError> {
        let result = self
            .process_inner(input_text, chat_history)
            .await;

        if let Err(ref error) = result {
            log_error!(
                "Agent {} failed for user {} session {}: {}",
                self.id,
                user_id,
                session_id,
                error
            );
        }

        result
    }

    async fn process_inner(
        &self,
        input_text: &str,
        chat_history: &[ConversationMessage],
    ) -> Result<ConversationMessage, AgentError> {
        let mut system_prompt = self.system_prompt();

        if let Some(retriever) = &self.retriever {
            let context = retriever.retrieve_and_combine_results(input_text).await?;
            system_prompt.push_str("\nHere is the context to use to answer the user's question:\n");
            system_prompt.push_str(&context);
        }

        let mut messages = Vec::with_capacity(chat_history.len() + 2);
        messages.push(ChatMessage::new("system", system_prompt));
        for msg in chat_history {
            messages.push(ChatMessage::new(msg.role.as_str(), msg.first_text()));
        }
        messages.push(ChatMessage::new("user", input_text));

        let request = CompletionRequest {
            messages,
            max_tokens: self.inference.max_tokens,
            temperature: self.inference.temperature,
            top_p: self.inference.top_p,
            stop_sequences: self.inference.stop_sequences.clone(),
            stream: self.streaming,
            tools: self.tools.as_ref().map(|tools| tools.schemas()),
        };

        if self.streaming {
            self.handle_streaming_response(request).await
        } else {
            self.handle_single_response(request).await
        }
    }

    async fn handle_single_response(
        &self,
        request: CompletionRequest,
    ) -> Result<ConversationMessage, AgentError> {
        let completion = self.provider.complete(request).await?;

        match completion.content {
            Some(text) if !text.is_empty() => Ok(ConversationMessage::assistant(text)),
            _ => Err(AgentError::EmptyCompletion),
        }
    }

    async fn handle_streaming_response(
        &self,
        request: CompletionRequest,
    ) -> Result<ConversationMessage, AgentError> {
        let stream = self.provider.complete_stream(request).await?;
        let streamed = accumulate(stream, self.on_token.as_ref(), Some(&self.cancel)).await?;

        if streamed.cancelled {
            crate::log_warn!(
                "Agent {}: stream cancelled after {} chars, returning partial",
                self.id,
                streamed.text.len()
            );
        }

        Ok(ConversationMessage::assistant(streamed.text))
    }
}
