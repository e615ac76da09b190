use crate::config::defaults::{
    DEFAULT_DEADLINE_SECS, DEFAULT_MAX_TOKENS, DEFAULT_MAX_TURNS, DEFAULT_SUMMARY_INSTRUCTION,
};
use crate::config::{AgentProfile, AppConfig};
use crate::domain::types::Transcript;
use std::time::Duration;

/// Knobs for one agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOptions {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    /// Maximum number of tool-requesting model turns.
    pub max_turns: u32,
    /// Wall-clock bound for the whole run, summary included.
    pub deadline: Option<Duration>,
    /// `{query}` is replaced with the request text.
    pub summary_instruction: String,
}

impl AgentOptions {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_turns: DEFAULT_MAX_TURNS,
            deadline: Some(Duration::from_secs(DEFAULT_DEADLINE_SECS)),
            summary_instruction: DEFAULT_SUMMARY_INSTRUCTION.to_string(),
        }
    }

    pub fn from_profile(config: &AppConfig, profile: &AgentProfile) -> Self {
        Self {
            provider: profile
                .provider
                .clone()
                .unwrap_or_else(|| config.default_provider.clone()),
            model: profile.model.clone().unwrap_or_else(|| config.model.clone()),
            max_tokens: config.max_tokens,
            max_turns: profile.max_turns,
            deadline: profile.deadline,
            summary_instruction: profile.summary_instruction.clone(),
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn summary_system(&self, query: &str) -> String {
        self.summary_instruction.replace("{query}", query)
    }
}

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub summary: String,
    /// Text fragments and `[Calling tool ...]` markers, in order.
    pub trace: Vec<String>,
    pub transcript: Transcript,
    pub model_calls: u32,
    pub tool_calls: u32,
}
