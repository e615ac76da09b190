use super::error::ToolInvokeError;
use crate::config::{LaunchTarget, ServerConfig};
use crate::constants::{TICKET_ID_ENV, USER_ID_ENV};
use crate::domain::types::Requester;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fully resolved process invocation for a tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub server: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
    pub handshake_timeout: Duration,
}

impl LaunchSpec {
    /// Picks the interpreter for script targets and injects the requester
    /// identity. Nothing is spawned here.
    pub fn resolve(server: &ServerConfig, requester: &Requester) -> Result<Self, ToolInvokeError> {
        let (program, mut args) = match &server.target {
            LaunchTarget::Script(path) => {
                let interpreter = interpreter_for(path).ok_or_else(|| {
                    ToolInvokeError::InvalidLaunch {
                        server: server.name.clone(),
                        message: format!(
                            "server script must be a .py or .js file, got '{}'",
                            path.display()
                        ),
                    }
                })?;
                (
                    PathBuf::from(interpreter),
                    vec![path.to_string_lossy().into_owned()],
                )
            }
            LaunchTarget::Command(command) => {
                if command.as_os_str().is_empty() {
                    return Err(ToolInvokeError::InvalidLaunch {
                        server: server.name.clone(),
                        message: "command must not be empty".to_string(),
                    });
                }
                (command.clone(), Vec::new())
            }
        };
        args.extend(server.args.iter().cloned());

        let mut env = server.env.clone();
        env.insert(USER_ID_ENV.to_string(), requester.user_id.clone());
        env.insert(TICKET_ID_ENV.to_string(), requester.ticket_id.clone());

        Ok(Self {
            server: server.name.clone(),
            program,
            args,
            env,
            workdir: server.workdir.clone(),
            handshake_timeout: server.handshake_timeout,
        })
    }
}

fn interpreter_for(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("py") => Some("python3"),
        Some("js") => Some("node"),
        _ => None,
    }
}
