mod connector;
mod error;
mod interface;
mod launch;
mod process;

pub use connector::StdioConnector;
pub use error::ToolInvokeError;
pub use interface::{RegistryConnector, ToolCallOutput, ToolRegistry};
pub use launch::LaunchSpec;
pub use process::McpProcess;
