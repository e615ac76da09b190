//! Anthropic Messages API client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::ModelProviderConfig;
use crate::domain::types::{ContentBlock, ToolDescriptor, Turn, TurnContent};
use crate::infrastructure::model::traits::ModelClient;
use crate::infrastructure::model::types::{ModelError, ModelRequest, ModelResponse, StopReason};

const DEFAULT_API_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub struct AnthropicClient {
    base: HttpClientBase,
    api_path: String,
}

impl AnthropicClient {
    pub fn from_config(config: &ModelProviderConfig) -> Self {
        Self {
            base: HttpClientBase::from_config(config),
            api_path: config
                .api_path
                .clone()
                .unwrap_or_else(|| DEFAULT_API_PATH.to_string()),
        }
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.base.build_url(&self.api_path);
        let payload = AnthropicRequest::from(&request);

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Sending request to Anthropic provider"
        );

        let response: AnthropicResponse = self
            .base
            .post_with_api_key(&url, ANTHROPIC_VERSION, &payload)
            .await?;
        debug!(
            stop_reason = response.stop_reason.as_deref().unwrap_or("none"),
            "Received response from Anthropic provider"
        );

        Ok(response.into_model_response())
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDescriptor],
}

fn no_tools(tools: &&[ToolDescriptor]) -> bool {
    tools.is_empty()
}

impl<'a> From<&'a ModelRequest> for AnthropicRequest<'a> {
    fn from(request: &'a ModelRequest) -> Self {
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref().filter(|text| !text.trim().is_empty()),
            messages: request.turns.iter().map(turn_to_wire).collect(),
            tools: &request.tools,
        }
    }
}

fn turn_to_wire(turn: &Turn) -> Value {
    let content = match &turn.content {
        TurnContent::Text(text) => Value::String(text.clone()),
        TurnContent::Blocks(blocks) => Value::Array(blocks.iter().map(block_to_wire).collect()),
    };
    json!({ "role": turn.role.as_str(), "content": content })
}

fn block_to_wire(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Text { text } => json!({ "type": "text", "text": text }),
        ContentBlock::ToolUse { id, name, input } => json!({
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": if input.is_object() { input.clone() } else { json!({}) },
        }),
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            let mut value = json!({
                "type": "tool_result",
                "tool_use_id": tool_use_id,
                "content": tool_result_content(content),
            });
            if *is_error {
                value["is_error"] = Value::Bool(true);
            }
            value
        }
    }
}

/// Tool result content must be a string or a list of text blocks.
fn tool_result_content(content: &Value) -> Value {
    match content {
        Value::String(_) => content.clone(),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| match item.get("type").and_then(Value::as_str) {
                    Some("text") => json!({
                        "type": "text",
                        "text": item.get("text").and_then(Value::as_str).unwrap_or_default(),
                    }),
                    _ => json!({ "type": "text", "text": item.to_string() }),
                })
                .collect(),
        ),
        Value::Null => Value::String(String::new()),
        other => Value::String(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<String>,
}

impl AnthropicResponse {
    fn into_model_response(self) -> ModelResponse {
        let content = self
            .content
            .into_iter()
            .filter_map(|block| match serde_json::from_value::<ContentBlock>(block) {
                Ok(block @ (ContentBlock::Text { .. } | ContentBlock::ToolUse { .. })) => {
                    Some(block)
                }
                Ok(ContentBlock::ToolResult { .. }) | Err(_) => None,
            })
            .collect();
        let stop_reason = self
            .stop_reason
            .as_deref()
            .map(StopReason::from_wire)
            .unwrap_or(StopReason::EndTurn);
        ModelResponse::new(content, stop_reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            provider: "anthropic".into(),
            model: "claude-3-5-sonnet-20241022".into(),
            system: Some("You are an analyst.".into()),
            turns: vec![
                Turn::user_text("read /a.txt"),
                Turn::assistant(vec![ContentBlock::tool_use(
                    "toolu_1",
                    "read_file",
                    json!({"file_path": "/a.txt"}),
                )]),
                Turn::tool_result(ContentBlock::tool_result(
                    "toolu_1",
                    json!([{"type": "text", "text": "hello", "annotations": null}]),
                    false,
                )),
            ],
            tools: vec![ToolDescriptor {
                name: "read_file".into(),
                description: Some("Read a file".into()),
                input_schema: json!({"type": "object"}),
            }],
            max_tokens: 1000,
        }
    }

    #[test]
    fn serializes_messages_tools_and_system() {
        let request = request();
        let payload = serde_json::to_value(AnthropicRequest::from(&request)).unwrap();

        assert_eq!(payload["system"], "You are an analyst.");
        assert_eq!(payload["max_tokens"], 1000);
        assert_eq!(payload["messages"][0]["content"], "read /a.txt");
        assert_eq!(payload["messages"][1]["content"][0]["type"], "tool_use");
        assert_eq!(payload["messages"][2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(
            payload["messages"][2]["content"][0]["content"],
            json!([{"type": "text", "text": "hello"}])
        );
        assert_eq!(payload["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn omits_tools_for_summary_calls() {
        let mut request = request();
        request.tools.clear();
        request.system = None;
        let payload = serde_json::to_value(AnthropicRequest::from(&request)).unwrap();
        assert!(payload.get("tools").is_none());
        assert!(payload.get("system").is_none());
    }

    #[test]
    fn error_results_carry_flag_and_string_content() {
        let block = ContentBlock::tool_result("toolu_2", json!({"code": 404}), true);
        let wire = block_to_wire(&block);
        assert_eq!(wire["is_error"], true);
        assert_eq!(wire["content"], "{\"code\":404}");
    }

    #[test]
    fn parses_text_and_tool_use_blocks_in_order() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "Let me read it."},
                {"type": "tool_use", "id": "toolu_1", "name": "read_file", "input": {"file_path": "/a.txt"}},
                {"type": "thinking", "thinking": "skipped"}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();
        let model_response = response.into_model_response();
        assert_eq!(model_response.stop_reason, StopReason::ToolUse);
        assert_eq!(model_response.content.len(), 2);
        assert!(matches!(
            &model_response.content[1],
            ContentBlock::ToolUse { name, .. } if name == "read_file"
        ));
    }
}
