use super::defaults::{DEFAULT_REST_BIND, DEFAULT_TRACE_DIR};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for RestServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_REST_BIND.to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// Where per-requester trace files are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TraceConfig {
    #[serde(default = "default_trace_dir")]
    pub directory: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            directory: default_trace_dir(),
        }
    }
}

fn default_trace_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TRACE_DIR)
}
