use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("invalid launch configuration for tool server '{server}': {message}")]
    InvalidLaunch { server: String, message: String },
    #[error("failed to spawn tool server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tool server '{server}' did not complete the handshake within {timeout:?}")]
    HandshakeTimeout { server: String, timeout: Duration },
    #[error("tool server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("tool server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tool server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("tool server '{server}' has no usable prompt '{prompt}'")]
    PromptUnavailable { server: String, prompt: String },
    #[error("tool server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("tool server '{server}' request cancelled")]
    Cancelled { server: String },
    #[error("tool server '{server}' has been shut down")]
    Closed { server: String },
}

impl ToolInvokeError {
    pub fn server(&self) -> &str {
        match self {
            Self::InvalidLaunch { server, .. }
            | Self::Spawn { server, .. }
            | Self::HandshakeTimeout { server, .. }
            | Self::Transport { server, .. }
            | Self::InvalidJson { server, .. }
            | Self::Rpc { server, .. }
            | Self::PromptUnavailable { server, .. }
            | Self::Terminated { server }
            | Self::Cancelled { server }
            | Self::Closed { server } => server,
        }
    }
}
