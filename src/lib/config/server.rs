use super::defaults::DEFAULT_HANDSHAKE_TIMEOUT_SECS;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// What to execute for a tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchTarget {
    /// A script whose interpreter is chosen from its extension.
    Script(PathBuf),
    /// An executable run as-is.
    Command(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub target: LaunchTarget,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
    pub handshake_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawServer {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) script: Option<String>,
    #[serde(default)]
    pub(crate) command: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    workdir: Option<String>,
    #[serde(default)]
    handshake_timeout_secs: Option<u64>,
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl ServerConfig {
    /// Builds the config once the loader has checked that exactly one of
    /// `script` or `command` is present.
    pub(crate) fn from_raw(raw: RawServer, target: LaunchTarget) -> Self {
        let target = match target {
            LaunchTarget::Script(path) => {
                LaunchTarget::Script(PathBuf::from(expand(&path.to_string_lossy())))
            }
            LaunchTarget::Command(path) => {
                LaunchTarget::Command(PathBuf::from(expand(&path.to_string_lossy())))
            }
        };

        Self {
            name: raw.name,
            target,
            args: raw.args.iter().map(|arg| expand(arg)).collect(),
            env: raw.env,
            workdir: raw.workdir.map(|dir| PathBuf::from(expand(&dir))),
            handshake_timeout: Duration::from_secs(
                raw.handshake_timeout_secs
                    .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn expands_env_vars_in_script_and_args() {
        unsafe {
            env::set_var("TEST_AGENT_ROOT", "/srv/agents");
            env::set_var("TEST_AGENT_ARG", "verbose");
        }

        let raw = RawServer {
            name: "analysis".to_string(),
            script: Some("${TEST_AGENT_ROOT}/analysis/server.py".to_string()),
            command: None,
            args: vec!["--mode".to_string(), "${TEST_AGENT_ARG}".to_string()],
            env: HashMap::new(),
            workdir: Some("${TEST_AGENT_ROOT}".to_string()),
            handshake_timeout_secs: None,
        };

        let config = ServerConfig::from_raw(
            raw,
            LaunchTarget::Script(PathBuf::from("${TEST_AGENT_ROOT}/analysis/server.py")),
        );

        match &config.target {
            LaunchTarget::Script(path) => {
                assert_eq!(path, &PathBuf::from("/srv/agents/analysis/server.py"));
            }
            other => panic!("unexpected target {other:?}"),
        }
        assert!(config.args.contains(&"verbose".to_string()));
        assert_eq!(config.workdir, Some(PathBuf::from("/srv/agents")));
        assert_eq!(config.handshake_timeout, Duration::from_secs(30));

        unsafe {
            env::remove_var("TEST_AGENT_ROOT");
            env::remove_var("TEST_AGENT_ARG");
        }
    }
}
