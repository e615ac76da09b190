//! OpenAI-compatible client implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::base::HttpClientBase;
use crate::config::ModelProviderConfig;
use crate::domain::types::{ContentBlock, Role, ToolDescriptor, Turn, TurnContent};
use crate::infrastructure::model::traits::ModelClient;
use crate::infrastructure::model::types::{ModelError, ModelRequest, ModelResponse, StopReason};

/// OpenAI-compatible client (works with OpenAI, Mistral, Groq, vLLM, etc.)
#[derive(Clone)]
pub struct OpenAIClient {
    base: HttpClientBase,
    api_path: String,
}

impl OpenAIClient {
    pub fn from_config(config: &ModelProviderConfig) -> Self {
        Self {
            base: HttpClientBase::from_config(config),
            api_path: config
                .api_path
                .clone()
                .unwrap_or_else(|| "/v1/chat/completions".to_string()),
        }
    }
}

#[async_trait]
impl ModelClient for OpenAIClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.base.build_url(&self.api_path);
        let payload = OpenAIRequest::from(&request);

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            messages = payload.messages.len(),
            tools = request.tools.len(),
            "Sending request to OpenAI-compatible provider"
        );

        let response: OpenAIResponse = self.base.post_with_bearer(&url, &payload).await?;
        debug!("Received response from OpenAI-compatible provider");

        response.into_model_response(&self.base.id)
    }
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
}

impl<'a> From<&'a ModelRequest> for OpenAIRequest<'a> {
    fn from(request: &'a ModelRequest) -> Self {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        if let Some(system) = request.system.as_deref().filter(|s| !s.trim().is_empty()) {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for turn in &request.turns {
            push_turn(&mut messages, turn);
        }
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages,
            tools: request.tools.iter().map(tool_to_wire).collect(),
            stream: false,
        }
    }
}

fn tool_to_wire(tool: &ToolDescriptor) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.clone().unwrap_or_default(),
            "parameters": tool.input_schema,
        }
    })
}

/// Tool results become `tool` role messages; everything else keeps its role.
fn push_turn(messages: &mut Vec<Value>, turn: &Turn) {
    let blocks = match &turn.content {
        TurnContent::Text(text) => {
            messages.push(json!({ "role": turn.role.as_str(), "content": text }));
            return;
        }
        TurnContent::Blocks(blocks) => blocks,
    };

    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Text { text } => texts.push(text.as_str()),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": input.to_string() },
            })),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => messages.push(json!({
                "role": "tool",
                "tool_call_id": tool_use_id,
                "content": flatten_content(content),
            })),
        }
    }

    match turn.role {
        Role::Assistant if !tool_calls.is_empty() => {
            let content = if texts.is_empty() {
                Value::Null
            } else {
                Value::String(texts.join("\n"))
            };
            messages.push(json!({
                "role": "assistant",
                "content": content,
                "tool_calls": tool_calls,
            }));
        }
        role if !texts.is_empty() => {
            messages.push(json!({ "role": role.as_str(), "content": texts.join("\n") }));
        }
        _ => {}
    }
}

fn flatten_content(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
    /// Some compatible servers send `null` instead of omitting the field.
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

impl OpenAIResponse {
    fn into_model_response(self, provider: &str) -> Result<ModelResponse, ModelError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::invalid_response(provider, "missing choices"))?;
        let message = choice
            .message
            .ok_or_else(|| ModelError::invalid_response(provider, "missing message"))?;

        let mut content = Vec::new();
        if let Some(text) = message.content.filter(|text| !text.is_empty()) {
            content.push(ContentBlock::text(text));
        }
        for call in message.tool_calls.unwrap_or_default() {
            let input = if call.function.arguments.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(&call.function.arguments).map_err(|err| {
                    ModelError::invalid_response(
                        provider,
                        format!("tool call '{}' has invalid arguments: {err}", call.id),
                    )
                })?
            };
            content.push(ContentBlock::tool_use(call.id, call.function.name, input));
        }

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("stop") | None => StopReason::EndTurn,
            Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
        };
        Ok(ModelResponse::new(content, stop_reason))
    }
}
