use super::defaults::{DEFAULT_DEADLINE_SECS, DEFAULT_MAX_TURNS, DEFAULT_SUMMARY_INSTRUCTION};
use serde::Deserialize;
use std::time::Duration;

/// A named agent: which tool server it launches, which MCP prompt it uses as
/// the system instruction, and how its conversation loop is bounded.
///
/// ```toml
/// [[agents]]
/// name = "analysis"
/// server = "analysis"
/// prompt = "analysis_system_prompt"
/// max_turns = 25
/// deadline_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProfile {
    pub name: String,
    pub server: String,
    pub prompt: Option<String>,
    /// Summary system instruction; `{query}` is replaced with the request text.
    pub summary_instruction: String,
    pub max_turns: u32,
    pub deadline: Option<Duration>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct RawAgent {
    pub(super) name: String,
    pub(super) server: String,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    summary_instruction: Option<String>,
    #[serde(default)]
    max_turns: Option<u32>,
    #[serde(default)]
    deadline_secs: Option<u64>,
    #[serde(default)]
    pub(super) provider: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

impl From<RawAgent> for AgentProfile {
    fn from(raw: RawAgent) -> Self {
        // deadline_secs = 0 turns the wall-clock guard off
        let deadline = match raw.deadline_secs.unwrap_or(DEFAULT_DEADLINE_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            name: raw.name,
            server: raw.server,
            prompt: raw.prompt.filter(|name| !name.trim().is_empty()),
            summary_instruction: raw
                .summary_instruction
                .unwrap_or_else(|| DEFAULT_SUMMARY_INSTRUCTION.to_string()),
            max_turns: raw.max_turns.unwrap_or(DEFAULT_MAX_TURNS).max(1),
            deadline,
            provider: raw.provider,
            model: raw.model,
        }
    }
}
