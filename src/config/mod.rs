//! Configuration system for conductor
//!
//! Supports loading configuration from:
//! 1. An explicit path supplied by the caller
//! 2. ~/.config/conductor/config.{CONDUCTOR_ENV}.json
//! 3. Default values
//!
//! Where CONDUCTOR_ENV can be: production (default), development, test
//!
//! Unknown keys in a config file are a hard error rather than being silently
//! dropped, so a typoed flag never goes unnoticed.
//!
//! # Examples
//!
//! ```
//! use conductor::config::OrchestratorConfig;
//!
//! let mut config = OrchestratorConfig::default();
//! config.log_execution_times = true;
//! config.max_message_pairs_per_agent = 50;
//! config.validate().unwrap();
//! ```
//!
//! ## Environment Variables
//!
//! Environment variables override config file values:
//! - CONDUCTOR_ENV
//! - CONDUCTOR_LOG_EXECUTION_TIMES
//! - CONDUCTOR_MAX_MESSAGE_PAIRS

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

fn default_max_retries() -> u32 {
    3
}

fn default_use_default_agent() -> bool {
    true
}

fn default_no_selected_agent_message() -> String {
    "I'm sorry, I couldn't determine how to handle your request. \
     Could you please rephrase it?"
        .to_string()
}

fn default_max_message_pairs() -> usize {
    100
}

/// Flags and limits controlling a [`MultiAgentOrchestrator`]
///
/// Immutable once handed to the orchestrator. Logging flags gate the
/// diagnostic output produced per request; the remaining fields bound
/// retries and stored history.
///
/// [`MultiAgentOrchestrator`]: crate::orchestrator::MultiAgentOrchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Print each agent's chat history before dispatching to it
    #[serde(default)]
    pub log_agent_chat: bool,

    /// Print the classifier's own chat history; gates
    /// `Diagnostics::print_chat_history(.., None)`, which LLM-backed
    /// classifier implementations call with their prompt history
    #[serde(default)]
    pub log_classifier_chat: bool,

    /// Print the classifier's raw (unparsed) output; gates the raw mode of
    /// `Diagnostics::log_classifier_output`, for classifier implementations
    /// whose model output needs parsing
    #[serde(default)]
    pub log_classifier_raw_output: bool,

    /// Print the classifier's processed output
    #[serde(default)]
    pub log_classifier_output: bool,

    /// Record and print per-operation execution times
    #[serde(default)]
    pub log_execution_times: bool,

    /// Retry budget for classifier implementations that re-prompt on
    /// malformed output; the shipped keyword classifier never retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fall back to the registered default agent when classification
    /// selects nothing
    #[serde(default = "default_use_default_agent")]
    pub use_default_agent_if_none_identified: bool,

    /// Message surfaced when classification itself failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_error_message: Option<String>,

    /// Reply returned when no agent was selected and no default applies
    #[serde(default = "default_no_selected_agent_message")]
    pub no_selected_agent_message: String,

    /// Reply returned when routing fails; the stringified error is used
    /// when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_routing_error_message: Option<String>,

    /// Stored history per (user, session, agent) is trimmed to this many
    /// user/assistant pairs
    #[serde(default = "default_max_message_pairs")]
    pub max_message_pairs_per_agent: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            log_agent_chat: false,
            log_classifier_chat: false,
            log_classifier_raw_output: false,
            log_classifier_output: false,
            log_execution_times: false,
            max_retries: default_max_retries(),
            use_default_agent_if_none_identified: default_use_default_agent(),
            classification_error_message: None,
            no_selected_agent_message: default_no_selected_agent_message(),
            general_routing_error_message: None,
            max_message_pairs_per_agent: default_max_message_pairs(),
        }
    }
}

impl OrchestratorConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: OrchestratorConfig = serde_json::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration with standard priority:
    /// 1. Explicit path
    /// 2. ~/.config/conductor/config.{CONDUCTOR_ENV}.json
    /// 3. Defaults
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            if path.exists() {
                tracing::info!("Loading config from: {:?}", path);
                return Self::from_file(path);
            } else {
                return Err(ConfigError::ValidationError(format!(
                    "Config file not found: {:?}",
                    path
                )));
            }
        }

        let env = std::env::var("CONDUCTOR_ENV").unwrap_or_else(|_| "production".to_string());

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir
                .join("conductor")
                .join(format!("config.{}.json", env));

            if config_path.exists() {
                tracing::info!("Loading config from: {:?}", config_path);
                return Self::from_file(&config_path);
            }
        }

        tracing::info!("Using default configuration with environment overrides");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("CONDUCTOR_LOG_EXECUTION_TIMES") {
            self.log_execution_times = parse_bool_flag(&value);
        }

        if let Ok(value) = std::env::var("CONDUCTOR_MAX_MESSAGE_PAIRS") {
            if let Ok(pairs) = value.parse() {
                self.max_message_pairs_per_agent = pairs;
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_message_pairs_per_agent == 0 {
            return Err(ConfigError::ValidationError(
                "max_message_pairs_per_agent must be greater than 0".to_string(),
            ));
        }

        if self.no_selected_agent_message.is_empty() {
            return Err(ConfigError::ValidationError(
                "no_selected_agent_message cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn parse_bool_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("yes")
}

fn default_temperature() -> f32 {
    0.2
}

fn default_top_p() -> f32 {
    0.6
}

/// Generation parameters forwarded to the completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    /// Temperature (0.0 - 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top P sampling (0.0 - 1.0)
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }
}

impl InferenceConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::ValidationError(format!(
                "Top P must be between 0.0 and 1.0, got {}",
                self.top_p
            )));
        }

        if let Some(0) = self.max_tokens {
            return Err(ConfigError::ValidationError(
                "max_tokens must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.log_execution_times);
        assert_eq!(config.max_message_pairs_per_agent, 100);
        assert!(config.use_default_agent_if_none_identified);
    }

    #[test]
    fn test_validation_rejects_zero_pairs() {
        let mut config = OrchestratorConfig::default();
        config.max_message_pairs_per_agent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let json = r#"{"log_agent_chat": true, "LOG_AGENT_CHAT": true}"#;
        let result: Result<OrchestratorConfig, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{"log_execution_times": true}"#;
        let config: OrchestratorConfig = serde_json::from_str(json).unwrap();
        assert!(config.log_execution_times);
        assert_eq!(config.max_retries, 3);
        assert_eq!(
            config.no_selected_agent_message,
            OrchestratorConfig::default().no_selected_agent_message
        );
    }

    #[test]
    fn test_inference_config_validation() {
        let mut config = InferenceConfig::default();
        assert!(config.validate().is_ok());

        config.temperature = 3.0;
        assert!(config.validate().is_err());

        config.temperature = 0.7;
        config.top_p = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_config() {
        let config = OrchestratorConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: OrchestratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            config.no_selected_agent_message,
            parsed.no_selected_agent_message
        );
    }
}
