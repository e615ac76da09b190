use super::errors::AgentError;
use super::models::{AgentOptions, AgentOutcome};
use crate::application::session::Session;
use crate::application::trace::TraceEvent;
use crate::domain::types::{ContentBlock, Transcript, Turn};
use crate::infrastructure::model::{ModelError, ModelProvider, ModelRequest, ModelResponse};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Agent<P: ModelProvider> {
    provider: Arc<P>,
    options: AgentOptions,
}

struct LoopState {
    transcript: Transcript,
    trace: Vec<String>,
    model_calls: u32,
    tool_calls: u32,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(provider: Arc<P>, options: AgentOptions) -> Self {
        Self { provider, options }
    }

    /// Drives the tool-calling loop for `query`, then asks for a summary.
    pub async fn run(&self, query: &str, session: &Session) -> Result<AgentOutcome, AgentError> {
        if query.trim().is_empty() {
            return Err(AgentError::Validation("query must not be empty".into()));
        }

        match self.options.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.drive(query, session))
                .await
                .unwrap_or_else(|_| {
                    warn!(?deadline, "Agent run hit its deadline");
                    Err(AgentError::DeadlineExceeded { deadline })
                }),
            None => self.drive(query, session).await,
        }
    }

    async fn drive(&self, query: &str, session: &Session) -> Result<AgentOutcome, AgentError> {
        info!(
            user_id = %session.requester().user_id,
            provider = %self.options.provider,
            model = %self.options.model,
            tools = session.catalog().len(),
            "Agent run started"
        );

        let mut state = LoopState {
            transcript: Transcript::new(),
            trace: Vec::new(),
            model_calls: 0,
            tool_calls: 0,
        };
        state.transcript.push(Turn::user_text(query));

        loop {
            let response = self
                .call_model(&mut state, session.system_prompt(), session)
                .await?;

            let mut pending = Vec::new();
            let mut requested = None;
            for block in response.content {
                match block {
                    ContentBlock::Text { text } => {
                        session
                            .record(TraceEvent::Text { text: text.clone() })
                            .await;
                        state.trace.push(text.clone());
                        pending.push(ContentBlock::Text { text });
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        pending.push(ContentBlock::tool_use(&id, &name, input.clone()));
                        requested = Some((id, name, input));
                        break;
                    }
                    ContentBlock::ToolResult { .. } => {
                        warn!("Ignoring tool_result block returned by the model");
                    }
                }
            }

            let Some((id, name, input)) = requested else {
                debug!(
                    model_calls = state.model_calls,
                    "Model answered without a tool call"
                );
                break;
            };

            if state.tool_calls >= self.options.max_turns {
                warn!(
                    limit = self.options.max_turns,
                    tool = %name,
                    "Agent exceeded max tool-calling turns"
                );
                return Err(AgentError::TurnLimitExceeded {
                    limit: self.options.max_turns,
                });
            }

            state.transcript.push(Turn::assistant(pending));
            info!(tool = %name, "Agent requested tool execution");
            let result = session.invoke_tool(&id, &name, input.clone()).await;
            state.trace.push(call_marker(&name, &input));
            state.tool_calls += 1;
            state.transcript.push(Turn::tool_result(result));
        }

        let summary_system = self.options.summary_system(query);
        let summary = self
            .call_summary(&mut state, summary_system)
            .await?
            .text()
            .ok_or_else(|| {
                ModelError::invalid_response(
                    &self.options.provider,
                    "summary response contained no text",
                )
            })?;

        info!(summary = %summary, "Agent produced summary");
        session
            .record(TraceEvent::Summary {
                text: summary.clone(),
            })
            .await;

        Ok(AgentOutcome {
            summary,
            trace: state.trace,
            transcript: state.transcript,
            model_calls: state.model_calls,
            tool_calls: state.tool_calls,
        })
    }

    async fn call_model(
        &self,
        state: &mut LoopState,
        system: Option<&str>,
        session: &Session,
    ) -> Result<ModelResponse, AgentError> {
        let request = ModelRequest {
            provider: self.options.provider.clone(),
            model: self.options.model.clone(),
            system: system.map(str::to_string),
            turns: state.transcript.turns().to_vec(),
            tools: session.catalog().tools().to_vec(),
            max_tokens: self.options.max_tokens,
        };
        state.model_calls += 1;
        Ok(self.provider.chat(request).await?)
    }

    async fn call_summary(
        &self,
        state: &mut LoopState,
        system: String,
    ) -> Result<ModelResponse, AgentError> {
        let request = ModelRequest {
            provider: self.options.provider.clone(),
            model: self.options.model.clone(),
            system: Some(system),
            turns: state.transcript.turns().to_vec(),
            tools: Vec::new(),
            max_tokens: self.options.max_tokens,
        };
        state.model_calls += 1;
        Ok(self.provider.chat(request).await?)
    }
}

fn call_marker(name: &str, input: &Value) -> String {
    format!("[Calling tool {name} with args {input}]")
}
