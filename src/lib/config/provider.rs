//! # Provider Configuration
//!
//! Model providers are the HTTP backends behind the model gateway.
//!
//! | Type | Wire format | API key header |
//! |------|-------------|----------------|
//! | `anthropic` | Messages API with `tool_use` blocks | `x-api-key` |
//! | `openai` | Chat Completions with function tools | `Authorization: Bearer` |

use super::defaults::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wire protocol spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "openai" | "openai-compatible" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

/// Configuration for one model provider.
///
/// # Example
///
/// ```toml
/// [[providers]]
/// id = "anthropic"
/// type = "anthropic"
/// endpoint = "https://api.anthropic.com"
/// api_key = "ANTHROPIC_API_KEY"
/// timeout_secs = 30
/// max_retries = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProviderConfig {
    /// Unique identifier used by `default_provider` and agent overrides
    pub id: String,
    pub kind: ProviderKind,
    /// Base URL of the API
    pub endpoint: String,
    /// Name of the environment variable holding the API key
    pub api_key: Option<String>,
    /// Overrides the default request path of the provider kind
    pub api_path: Option<String>,
    pub timeout: Duration,
    /// Total attempts for retryable failures (1 disables retries)
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct RawProviderConfig {
    pub(super) id: String,
    #[serde(rename = "type", default)]
    pub(super) provider_type: String,
    pub(super) endpoint: Option<String>,
    pub(super) api_key: Option<String>,
    #[serde(default)]
    pub(super) api_path: Option<String>,
    #[serde(default)]
    pub(super) timeout_secs: Option<u64>,
    #[serde(default)]
    pub(super) max_retries: Option<u32>,
}

impl ModelProviderConfig {
    pub(super) fn from_raw(raw: RawProviderConfig, kind: ProviderKind, endpoint: String) -> Self {
        Self {
            id: raw.id,
            kind,
            endpoint,
            api_key: raw.api_key,
            api_path: raw.api_path,
            timeout: Duration::from_secs(raw.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            max_retries: raw.max_retries.unwrap_or(DEFAULT_MAX_RETRIES).max(1),
        }
    }

    pub fn is_anthropic(&self) -> bool {
        self.kind == ProviderKind::Anthropic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_kinds_case_insensitively() {
        assert_eq!(ProviderKind::parse("Anthropic"), Some(ProviderKind::Anthropic));
        assert_eq!(ProviderKind::parse("OPENAI"), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::parse("gemini"), None);
    }

    #[test]
    fn applies_timeout_and_retry_defaults() {
        let raw = RawProviderConfig {
            id: "anthropic".into(),
            provider_type: "anthropic".into(),
            endpoint: None,
            api_key: None,
            api_path: None,
            timeout_secs: None,
            max_retries: Some(0),
        };
        let config =
            ModelProviderConfig::from_raw(raw, ProviderKind::Anthropic, "http://x".into());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 1);
        assert!(config.is_anthropic());
    }
}
