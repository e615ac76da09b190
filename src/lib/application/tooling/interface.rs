use super::error::ToolInvokeError;
use super::launch::LaunchSpec;
use crate::domain::types::ToolDescriptor;
use async_trait::async_trait;
use serde_json::Value;

/// Output of a `tools/call` request.
///
/// `is_error` mirrors the MCP `isError` flag: the server ran the tool and
/// reported a failure inside the result payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallOutput {
    pub content: Value,
    pub is_error: bool,
}

impl ToolCallOutput {
    pub fn success(content: Value) -> Self {
        Self {
            content,
            is_error: false,
        }
    }
}

/// A live connection to one tool server.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError>;

    /// Resolves a named prompt to the text of its first message.
    async fn get_prompt(&self, name: &str) -> Result<String, ToolInvokeError>;

    async fn call_tool(&self, name: &str, arguments: Value)
    -> Result<ToolCallOutput, ToolInvokeError>;

    /// Kills the server process and fails outstanding requests. Safe to call
    /// more than once.
    async fn shutdown(&self);
}

/// Launches a tool server and completes the handshake.
#[async_trait]
pub trait RegistryConnector: Send + Sync {
    async fn connect(&self, launch: &LaunchSpec)
    -> Result<Box<dyn ToolRegistry>, ToolInvokeError>;
}
