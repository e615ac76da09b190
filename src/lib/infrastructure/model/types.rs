//! Model types - Request, Response, and Error types

use crate::domain::types::{ContentBlock, ToolDescriptor, Turn};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// One call to the model gateway.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub provider: String,
    pub model: String,
    pub system: Option<String>,
    pub turns: Vec<Turn>,
    /// Empty means the model is called without tools.
    pub tools: Vec<ToolDescriptor>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    Other(String),
}

impl StopReason {
    pub fn from_wire(value: &str) -> Self {
        match value {
            "end_turn" => Self::EndTurn,
            "tool_use" => Self::ToolUse,
            "max_tokens" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Ordered content blocks produced by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl ModelResponse {
    pub fn new(content: Vec<ContentBlock>, stop_reason: StopReason) -> Self {
        Self {
            content,
            stop_reason,
        }
    }

    /// Text blocks joined with newlines, or `None` when there are none.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' is not configured")]
    ProviderNotFound { provider: String },
    #[error("provider '{provider}' requires an API key")]
    MissingApiKey { provider: String },
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' did not respond within {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
    #[error("provider '{provider}' returned status {status}: {body}")]
    Status {
        provider: String,
        status: StatusCode,
        body: String,
    },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ModelError {
    pub fn provider_not_found(provider: impl Into<String>) -> Self {
        Self::ProviderNotFound {
            provider: provider.into(),
        }
    }

    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn timeout(provider: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            timeout,
        }
    }

    pub fn status(provider: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Server errors, timeouts and connection failures. Client errors and
    /// malformed bodies are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ModelError::Timeout { .. } => true,
            ModelError::Status { status, .. } => status.is_server_error(),
            ModelError::Network { source, .. } => source.is_connect() || source.is_timeout(),
            ModelError::ProviderNotFound { .. }
            | ModelError::MissingApiKey { .. }
            | ModelError::InvalidResponse { .. } => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ModelError::ProviderNotFound { provider } => {
                format!("Model provider '{provider}' is not configured.")
            }
            ModelError::MissingApiKey { provider } => {
                format!("Model provider '{provider}' requires an API key.")
            }
            ModelError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Could not connect to model provider '{provider}'.")
                } else {
                    format!("Network error while calling model provider '{provider}'.")
                }
            }
            ModelError::Timeout { provider, .. } => {
                format!("Model provider '{provider}' timed out.")
            }
            ModelError::Status {
                provider, status, ..
            } => match *status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    format!("Model provider '{provider}' rejected the credentials.")
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    format!("Model provider '{provider}' is rate limiting requests.")
                }
                status if status.is_server_error() => {
                    format!("Model provider '{provider}' is unavailable.")
                }
                status => format!(
                    "Request to model provider '{provider}' failed with status {}.",
                    status.as_u16()
                ),
            },
            ModelError::InvalidResponse { provider, .. } => {
                format!("Model provider '{provider}' returned a response that could not be read.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_server_errors_and_timeouts_are_retryable() {
        assert!(ModelError::status("anthropic", StatusCode::BAD_GATEWAY, "").is_retryable());
        assert!(ModelError::timeout("anthropic", Duration::from_secs(30)).is_retryable());
        assert!(!ModelError::status("anthropic", StatusCode::BAD_REQUEST, "").is_retryable());
        assert!(!ModelError::invalid_response("anthropic", "bad json").is_retryable());
        assert!(!ModelError::missing_api_key("anthropic").is_retryable());
    }

    #[test]
    fn response_text_joins_text_blocks_only() {
        let response = ModelResponse::new(
            vec![
                ContentBlock::text("first"),
                ContentBlock::tool_use("t1", "read_file", serde_json::json!({})),
                ContentBlock::text("second"),
            ],
            StopReason::ToolUse,
        );
        assert_eq!(response.text().as_deref(), Some("first\nsecond"));
        assert_eq!(
            ModelResponse::new(vec![], StopReason::EndTurn).text(),
            None
        );
    }

    #[test]
    fn stop_reasons_map_from_wire_names() {
        assert_eq!(StopReason::from_wire("tool_use"), StopReason::ToolUse);
        assert_eq!(
            StopReason::from_wire("refusal"),
            StopReason::Other("refusal".into())
        );
    }
}
