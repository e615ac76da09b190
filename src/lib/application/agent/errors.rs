use crate::application::tooling::ToolInvokeError;
use crate::infrastructure::model::ModelError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("tool server connection failed: {0}")]
    Connection(#[source] ToolInvokeError),
    #[error("model gateway call failed: {0}")]
    Gateway(#[from] ModelError),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("agent stopped after {limit} tool-calling turns")]
    TurnLimitExceeded { limit: u32 },
    #[error("agent did not finish within {deadline:?}")]
    DeadlineExceeded { deadline: Duration },
    #[error("unknown agent profile '{0}'")]
    UnknownAgent(String),
}

impl From<ToolInvokeError> for AgentError {
    fn from(err: ToolInvokeError) -> Self {
        match err {
            ToolInvokeError::InvalidLaunch { message, .. } => AgentError::Validation(message),
            other => AgentError::Connection(other),
        }
    }
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Connection(err) => {
                format!("Could not reach tool server '{}'.", err.server())
            }
            AgentError::Gateway(err) => err.user_message(),
            AgentError::Validation(message) => message.clone(),
            AgentError::TurnLimitExceeded { limit } => {
                format!("The agent did not reach an answer within {limit} tool calls.")
            }
            AgentError::DeadlineExceeded { deadline } => format!(
                "The agent did not reach an answer within {} seconds.",
                deadline.as_secs()
            ),
            AgentError::UnknownAgent(name) => format!("Agent '{name}' is not configured."),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool requested: {0}")]
    UnknownTool(String),
    #[error("failed to execute tool '{tool}': {source}")]
    Execution {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}

impl ToolError {
    /// Text placed in the error tool result shown to the model.
    pub fn user_message(&self) -> String {
        match self {
            ToolError::UnknownTool(name) => {
                format!("Tool \"{name}\" is not available on this server.")
            }
            ToolError::Execution { tool, source } => {
                format!("Tool \"{tool}\" failed: {source}")
            }
        }
    }
}
