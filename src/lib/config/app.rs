use super::agent::AgentProfile;
use super::error::ConfigError;
use super::provider::ModelProviderConfig;
use super::rest::{RestServerConfig, TraceConfig};
use super::server::ServerConfig;
use std::net::SocketAddr;
use std::path::Path;

/// Application configuration loaded from agent.toml
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub providers: Vec<ModelProviderConfig>,
    pub servers: Vec<ServerConfig>,
    pub agents: Vec<AgentProfile>,
    pub rest_server: RestServerConfig,
    pub trace: TraceConfig,
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Parse configuration from TOML text without touching the filesystem
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        super::loader::parse_config(content, Path::new("<inline>"))
    }

    pub fn agent(&self, name: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|agent| agent.name == name)
    }

    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|server| server.name == name)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.rest_server
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress {
                bind: self.rest_server.bind.clone(),
            })
    }
}
