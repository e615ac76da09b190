use super::CONFIG_PATH;
use super::agent::{AgentProfile, RawAgent};
use super::defaults::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use super::error::ConfigError;
use super::provider::{ModelProviderConfig, ProviderKind, RawProviderConfig};
use super::rest::{RestServerConfig, TraceConfig};
use super::server::{LaunchTarget, RawServer, ServerConfig};
use crate::constants::ENV_PATH;
use dotenvy::from_filename;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    pub model: Option<String>,
    pub default_provider: Option<String>,
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub providers: Vec<RawProviderConfig>,
    #[serde(default)]
    pub servers: Vec<RawServer>,
    #[serde(default)]
    pub agents: Vec<RawAgent>,
    #[serde(default)]
    pub rest_server: RestServerConfig,
    #[serde(default)]
    pub trace: TraceConfig,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
    });
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<super::AppConfig, ConfigError> {
    ensure_env_loaded();
    let config_path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    read_config(config_path)
}

fn read_config(path: &Path) -> Result<super::AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path)
}

pub(super) fn parse_config(content: &str, path: &Path) -> Result<super::AppConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_and_build(parsed)
}

fn validate_and_build(parsed: RawConfig) -> Result<super::AppConfig, ConfigError> {
    let default_provider = parsed
        .default_provider
        .ok_or(ConfigError::MissingDefaultProvider)?;
    let model = parsed.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

    if parsed.providers.is_empty() {
        return Err(ConfigError::NoProvidersConfigured);
    }

    let mut providers: Vec<ModelProviderConfig> = Vec::new();
    for raw_provider in parsed.providers {
        let Some(endpoint) = raw_provider.endpoint.clone() else {
            return Err(ConfigError::MissingEndpoint {
                provider: raw_provider.id.clone(),
            });
        };
        let kind = ProviderKind::parse(&raw_provider.provider_type).ok_or_else(|| {
            ConfigError::UnsupportedProviderType {
                provider: raw_provider.id.clone(),
                kind: raw_provider.provider_type.clone(),
            }
        })?;
        providers.push(ModelProviderConfig::from_raw(raw_provider, kind, endpoint));
    }
    if !providers.iter().any(|p| p.id == default_provider) {
        return Err(ConfigError::ProviderNotFound {
            provider: default_provider,
        });
    }

    let mut servers = Vec::with_capacity(parsed.servers.len());
    for raw_server in parsed.servers {
        let target = match (&raw_server.script, &raw_server.command) {
            (Some(script), None) => LaunchTarget::Script(PathBuf::from(script)),
            (None, Some(command)) => LaunchTarget::Command(PathBuf::from(command)),
            _ => {
                return Err(ConfigError::InvalidLaunchTarget {
                    server: raw_server.name.clone(),
                });
            }
        };
        servers.push(ServerConfig::from_raw(raw_server, target));
    }

    let mut agents = Vec::with_capacity(parsed.agents.len());
    for raw_agent in parsed.agents {
        if !servers.iter().any(|s| s.name == raw_agent.server) {
            return Err(ConfigError::UnknownServer {
                agent: raw_agent.name.clone(),
                server: raw_agent.server.clone(),
            });
        }
        if let Some(provider) = raw_agent.provider.as_deref() {
            if !providers.iter().any(|p| p.id == provider) {
                return Err(ConfigError::UnknownAgentProvider {
                    agent: raw_agent.name.clone(),
                    provider: provider.to_string(),
                });
            }
        }
        agents.push(AgentProfile::from(raw_agent));
    }

    debug!(
        providers = providers.len(),
        servers = servers.len(),
        agents = agents.len(),
        "Configuration validated"
    );

    Ok(super::AppConfig {
        default_provider,
        model,
        max_tokens: parsed.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        providers,
        servers,
        agents,
        rest_server: parsed.rest_server,
        trace: parsed.trace,
    })
}
