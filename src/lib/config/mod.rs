pub mod agent;
pub mod app;
pub mod defaults;
pub mod error;
pub mod loader;
pub mod provider;
pub mod rest;
pub mod server;

pub use crate::constants::CONFIG_PATH;

pub use agent::AgentProfile;
pub use app::AppConfig;
pub use error::ConfigError;
pub use provider::{ModelProviderConfig, ProviderKind};
pub use rest::{RestServerConfig, TraceConfig};
pub use server::{LaunchTarget, ServerConfig};
