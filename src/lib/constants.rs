//! Application constants
//!
//! Single source of truth for paths and other constants.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/agent.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// MCP protocol revision sent during the handshake
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Environment variables injected into every tool server process
pub const USER_ID_ENV: &str = "USER_ID";
pub const TICKET_ID_ENV: &str = "TICKET_ID";

/// Agent profiles behind the HTTP routes
pub const ANALYSIS_AGENT: &str = "analysis";
pub const EXECUTION_AGENT: &str = "execution";
