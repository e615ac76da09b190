//! Dynamic model provider with multiple backends

use async_trait::async_trait;
use std::collections::HashMap;

use super::factory::ProviderFactory;
use super::traits::{ModelClient, ModelProvider};
use super::types::{ModelError, ModelRequest, ModelResponse};
use crate::config::ModelProviderConfig;

/// Dynamic model provider that routes requests to appropriate backends
#[derive(Default)]
pub struct DynamicModelProvider {
    backends: HashMap<String, Box<dyn ModelClient>>,
}

impl DynamicModelProvider {
    /// Create provider from config list using factory
    pub fn from_configs(configs: &[ModelProviderConfig]) -> Self {
        let mut provider = Self::default();
        for config in configs {
            provider.insert(ProviderFactory::create(config));
        }
        provider
    }

    /// Register a client under its own id, replacing any previous one
    pub fn insert(&mut self, client: Box<dyn ModelClient>) {
        self.backends.insert(client.id().to_string(), client);
    }

    /// Check if provider exists
    pub fn contains(&self, provider: &str) -> bool {
        self.backends.contains_key(provider)
    }
}

#[async_trait]
impl ModelProvider for DynamicModelProvider {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let client = self
            .backends
            .get(&request.provider)
            .ok_or_else(|| ModelError::provider_not_found(&request.provider))?;
        client.chat(request).await
    }
}
