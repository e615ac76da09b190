use super::error::ToolInvokeError;
use super::interface::{RegistryConnector, ToolRegistry};
use super::launch::LaunchSpec;
use super::process::McpProcess;
use async_trait::async_trait;

/// Connects to tool servers by spawning them as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioConnector;

#[async_trait]
impl RegistryConnector for StdioConnector {
    async fn connect(
        &self,
        launch: &LaunchSpec,
    ) -> Result<Box<dyn ToolRegistry>, ToolInvokeError> {
        let process = McpProcess::spawn(launch).await?;
        Ok(Box::new(process))
    }
}
