//! Config-gated diagnostic output
//!
//! Each method checks its own flag, so call sites stay free of `if config`
//! clutter. All output goes through the file-log macros.

use crate::config::OrchestratorConfig;
use crate::log_info;
use crate::types::ConversationMessage;
use std::collections::HashMap;

const PREVIEW_CHARS: usize = 80;

/// Diagnostic sink honoring an [`OrchestratorConfig`]'s logging flags
#[derive(Debug, Clone)]
pub struct Diagnostics {
    log_agent_chat: bool,
    log_classifier_chat: bool,
    log_classifier_raw_output: bool,
    log_classifier_output: bool,
    log_execution_times: bool,
}

impl Diagnostics {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            log_agent_chat: config.log_agent_chat,
            log_classifier_chat: config.log_classifier_chat,
            log_classifier_raw_output: config.log_classifier_raw_output,
            log_classifier_output: config.log_classifier_output,
            log_execution_times: config.log_execution_times,
        }
    }

    pub fn log_header(&self, title: &str) {
        log_info!("> {}:", title);
    }

    /// Log a conversation, one line per message, text trimmed to a preview
    ///
    /// `agent_id = None` means the classifier's own history, gated by its
    /// separate flag.
    pub fn print_chat_history(&self, history: &[ConversationMessage], agent_id: Option<&str>) {
        let enabled = match agent_id {
            Some(_) => self.log_agent_chat,
            None => self.log_classifier_chat,
        };
        if !enabled {
            return;
        }

        let owner = agent_id.unwrap_or("classifier");
        self.log_header(&format!("Chat History for {}", owner));
        if history.is_empty() {
            log_info!("> - None -");
        }
        for (index, message) in history.iter().enumerate() {
            log_info!("{}", format_history_line(index, message));
        }
    }

    /// Log what the classifier produced; `raw` distinguishes unparsed
    /// model output from the processed selection
    pub fn log_classifier_output(&self, output: &str, raw: bool) {
        if raw && !self.log_classifier_raw_output {
            return;
        }
        if !raw && !self.log_classifier_output {
            return;
        }

        let label = if raw {
            "Raw Classifier Output"
        } else {
            "Processed Classifier Output"
        };
        self.log_header(label);
        log_info!("> {}", output);
    }

    /// Log all recorded timings, one line each
    pub fn print_execution_times(&self, execution_times: &HashMap<String, f64>) {
        if !self.log_execution_times {
            return;
        }

        self.log_header("Execution Times");
        if execution_times.is_empty() {
            log_info!("> - None -");
        }
        for (label, seconds) in execution_times {
            log_info!("> {}: {:.3}s", label, seconds);
        }
    }
}

/// One numbered history line: `> 1. USER: ...`
fn format_history_line(index: usize, message: &ConversationMessage) -> String {
    format!(
        "> {}. {}: {}",
        index + 1,
        message.role.as_str().to_uppercase(),
        trim_preview(message.first_text())
    )
}

fn trim_preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_preview_short_text_untouched() {
        assert_eq!(trim_preview("hello"), "hello");
    }

    #[test]
    fn test_trim_preview_long_text_truncated() {
        let long = "x".repeat(200);
        let trimmed = trim_preview(&long);
        assert_eq!(trimmed.chars().count(), PREVIEW_CHARS + 3);
        assert!(trimmed.ends_with("..."));
    }

    #[test]
    fn test_history_lines_are_numbered_and_upcased() {
        let line = format_history_line(0, &ConversationMessage::user("hola"));
        assert_eq!(line, "> 1. USER: hola");

        let line = format_history_line(1, &ConversationMessage::assistant("x".repeat(200)));
        assert!(line.starts_with("> 2. ASSISTANT: "));
        assert!(line.ends_with("..."));
    }

    #[test]
    fn test_flags_follow_config() {
        let mut config = OrchestratorConfig::default();
        config.log_execution_times = true;
        let diagnostics = Diagnostics::new(&config);
        assert!(diagnostics.log_execution_times);
        assert!(!diagnostics.log_agent_chat);
    }
}
