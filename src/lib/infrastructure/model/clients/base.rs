//! Base HTTP client with shared logic

use crate::config::ModelProviderConfig;
use crate::infrastructure::model::factory::resolve_api_key;
use crate::infrastructure::model::retry::RetryPolicy;
use crate::infrastructure::model::types::ModelError;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Base HTTP client with shared functionality
#[derive(Clone)]
pub struct HttpClientBase {
    pub id: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub http: Client,
}

impl HttpClientBase {
    pub fn from_config(config: &ModelProviderConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(
                    provider = %config.id,
                    %err,
                    "Failed to build HTTP client, using defaults with per-request timeout"
                );
                Client::new()
            });
        Self {
            id: config.id.clone(),
            endpoint: config.endpoint.clone(),
            api_key: resolve_api_key(&config.id, config.api_key.as_deref()),
            timeout: config.timeout,
            retry: RetryPolicy::new(config.max_retries),
            http,
        }
    }

    /// Build URL from endpoint and path
    pub fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Post JSON with bearer auth
    pub async fn post_with_bearer<Req, Res>(&self, url: &str, body: &Req) -> Result<Res, ModelError>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let api_key = self.require_api_key()?;
        let headers = [("Authorization", format!("Bearer {api_key}"))];
        self.post_json(url, &headers, body).await
    }

    /// Post JSON with the Anthropic `x-api-key` and version headers
    pub async fn post_with_api_key<Req, Res>(
        &self,
        url: &str,
        version: &str,
        body: &Req,
    ) -> Result<Res, ModelError>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let api_key = self.require_api_key()?;
        let headers = [
            ("x-api-key", api_key.to_string()),
            ("anthropic-version", version.to_string()),
        ];
        self.post_json(url, &headers, body).await
    }

    async fn post_json<Req, Res>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Req,
    ) -> Result<Res, ModelError>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let this = self;
        self.retry
            .execute(&self.id, move || async move {
                let response = this
                    .request(url, headers, body)
                    .send()
                    .await
                    .map_err(|err| this.map_send_error(err))?;
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|err| this.map_send_error(err))?;
                debug!(provider = %this.id, status = status.as_u16(), "Provider responded");

                if !status.is_success() {
                    return Err(ModelError::status(&this.id, status, truncate(&text, 512)));
                }
                serde_json::from_str(&text)
                    .map_err(|err| ModelError::invalid_response(&this.id, err.to_string()))
            })
            .await
    }

    /// Every request carries the provider timeout, whatever the client was
    /// built with.
    fn request<Req: Serialize>(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &Req,
    ) -> RequestBuilder {
        let mut request = self
            .http
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        request
    }

    fn map_send_error(&self, err: reqwest::Error) -> ModelError {
        if err.is_timeout() {
            ModelError::timeout(&self.id, self.timeout)
        } else {
            ModelError::network(&self.id, err)
        }
    }

    fn require_api_key(&self) -> Result<&str, ModelError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::missing_api_key(&self.id))
    }
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    fn config() -> ModelProviderConfig {
        ModelProviderConfig {
            id: "anthropic".into(),
            kind: ProviderKind::Anthropic,
            endpoint: "https://api.anthropic.com/".into(),
            api_key: None,
            api_path: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    #[test]
    fn builds_urls_without_double_slashes() {
        let base = HttpClientBase::from_config(&config());
        assert_eq!(
            base.build_url("/v1/messages"),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let base = HttpClientBase::from_config(&config());
        let result: Result<serde_json::Value, _> = base
            .post_with_api_key("http://127.0.0.1:9/v1/messages", "2023-06-01", &serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(ModelError::MissingApiKey { .. })));
    }

    #[test]
    fn requests_carry_the_provider_timeout() {
        let base = HttpClientBase::from_config(&config());
        let request = base
            .request(
                "https://api.anthropic.com/v1/messages",
                &[("x-api-key", "sk-test".to_string())],
                &serde_json::json!({"model": "claude"}),
            )
            .build()
            .expect("request builds");
        assert_eq!(request.timeout(), Some(&Duration::from_secs(30)));
        assert_eq!(request.headers()["x-api-key"], "sk-test");
    }

    #[test]
    fn truncates_long_error_bodies() {
        let long = "x".repeat(600);
        let short = truncate(&long, 512);
        assert_eq!(short.len(), 515);
        assert_eq!(truncate("short", 512), "short");
    }
}
