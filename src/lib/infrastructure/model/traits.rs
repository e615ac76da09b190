//! Gateway seams used by the conversation loop.

use super::types::{ModelError, ModelRequest, ModelResponse};
use async_trait::async_trait;

/// What the agent loop talks to: one call sends the transcript, the tool
/// catalog and an optional system prompt, and returns the model's content
/// blocks with a stop reason.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}

/// One configured upstream, keyed by provider id.
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn id(&self) -> &str;

    /// Translates the request to the provider's wire format and back,
    /// retrying transient failures.
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}
