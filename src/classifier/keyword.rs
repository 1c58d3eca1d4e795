//! Keyword-overlap classifier
//!
//! Heuristic, non-LLM classification: each agent's name and description are
//! tokenized into a keyword set and the input is scored by overlap. Useful
//! as a default and for tests; zero overlap selects no agent.

use super::{Classifier, ClassifierError, ClassifierResult};
use crate::agent::Agent;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[a-zA-Z0-9]+").unwrap();
}

/// Words too generic to signal an agent match
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "you", "your", "about", "from", "into", "can",
    "are", "will", "has", "have", "any", "all",
];

fn tokenize(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|word| word.len() >= 3 && !STOPWORDS.contains(&word.as_str()))
        .collect()
}

/// Classifier scoring keyword overlap with agent names and descriptions
#[derive(Default)]
pub struct KeywordClassifier {
    candidates: Vec<(Arc<Agent>, HashSet<String>)>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn score(&self, input_words: &HashSet<String>) -> Option<(Arc<Agent>, f64)> {
        if input_words.is_empty() {
            return None;
        }

        let mut best: Option<(Arc<Agent>, usize)> = None;

        for (agent, keywords) in &self.candidates {
            let matched = input_words.intersection(keywords).count();
            if matched == 0 {
                continue;
            }
            match &best {
                Some((_, best_matched)) if *best_matched >= matched => {}
                _ => best = Some((agent.clone(), matched)),
            }
        }

        best.map(|(agent, matched)| {
            let confidence = (matched as f64 / input_words.len() as f64).min(1.0);
            (agent, confidence)
        })
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    fn set_agents(&mut self, agents: &HashMap<String, Arc<Agent>>) {
        let mut candidates: Vec<(Arc<Agent>, HashSet<String>)> = agents
            .values()
            .map(|agent| {
                let mut keywords = tokenize(agent.name());
                keywords.extend(tokenize(agent.description()));
                (agent.clone(), keywords)
            })
            .collect();
        // Stable iteration order so ties resolve deterministically
        candidates.sort_by(|a, b| a.0.id().cmp(b.0.id()));
        self.candidates = candidates;
    }

    async fn classify(
        &self,
        input: &str,
        _user_id: &str,
        _session_id: &str,
    ) -> Result<ClassifierResult, ClassifierError> {
        let input_words = tokenize(input);

        Ok(match self.score(&input_words) {
            Some((agent, confidence)) => ClassifierResult::selected(agent, confidence),
            None => ClassifierResult::none(),
        })
    }
}
