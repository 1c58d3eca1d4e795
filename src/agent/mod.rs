//! Agent module: personas, completion providers and streaming support
//!
//! An [`Agent`] answers one user turn at a time given prior chat history.
//! It renders a system prompt from a template, optionally augments it with
//! retrieved context, and forwards the role-tagged message list to its
//! [`CompletionProvider`] in single-shot or streaming mode.

mod base;
pub mod provider;
pub mod retriever;
pub mod streaming;

pub use base::{
    generate_key_from_name, replace_placeholders, Agent, AgentError, AgentOptions,
    TemplateValue, TemplateVariables, DEFAULT_PROMPT_TEMPLATE,
};
pub use provider::{
    ChatMessage, Completion, CompletionProvider, CompletionRequest, ProviderError, TokenStream,
};
pub use retriever::{Retriever, RetrieverError};
pub use streaming::{accumulate, StreamedCompletion, TokenCallback};
