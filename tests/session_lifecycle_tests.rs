// Session lifecycle tests - the registry is released exactly once on every
// exit path of run_in_session, and setup failures never leak a server.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Value, json};
use sf_agent_gateway::agent::{Agent, AgentError, AgentOptions};
use sf_agent_gateway::application::session::{SessionParams, run_in_session};
use sf_agent_gateway::application::trace::MemoryTraceSink;
use sf_agent_gateway::config::{LaunchTarget, ServerConfig};
use sf_agent_gateway::model::{
    ModelError, ModelProvider, ModelRequest, ModelResponse, StopReason,
};
use sf_agent_gateway::tooling::{
    LaunchSpec, RegistryConnector, ToolCallOutput, ToolInvokeError, ToolRegistry,
};
use sf_agent_gateway::types::{ContentBlock, Requester, ToolDescriptor};
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct Counters {
    connects: AtomicUsize,
    tool_calls: AtomicUsize,
    shutdowns: AtomicUsize,
}

#[derive(Clone, Copy, PartialEq)]
enum Failure {
    None,
    Connect,
    Prompt,
}

struct CountingConnector {
    counters: Arc<Counters>,
    failure: Failure,
    launches: std::sync::Mutex<Vec<LaunchSpec>>,
}

impl CountingConnector {
    fn new(failure: Failure) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            failure,
            launches: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn connects(&self) -> usize {
        self.counters.connects.load(Ordering::SeqCst)
    }

    fn shutdowns(&self) -> usize {
        self.counters.shutdowns.load(Ordering::SeqCst)
    }

    fn tool_calls(&self) -> usize {
        self.counters.tool_calls.load(Ordering::SeqCst)
    }
}

struct CountingRegistry {
    counters: Arc<Counters>,
    failure: Failure,
}

#[async_trait]
impl ToolRegistry for CountingRegistry {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        Ok(vec![ToolDescriptor {
            name: "read_file".into(),
            description: None,
            input_schema: json!({"type": "object"}),
        }])
    }

    async fn get_prompt(&self, name: &str) -> Result<String, ToolInvokeError> {
        if self.failure == Failure::Prompt {
            return Err(ToolInvokeError::PromptUnavailable {
                server: "analysis".into(),
                prompt: name.into(),
            });
        }
        Ok("You analyse Salesforce orgs.".into())
    }

    async fn call_tool(
        &self,
        _name: &str,
        _arguments: Value,
    ) -> Result<ToolCallOutput, ToolInvokeError> {
        self.counters.tool_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ToolCallOutput::success(json!("ok")))
    }

    async fn shutdown(&self) {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistryConnector for CountingConnector {
    async fn connect(
        &self,
        launch: &LaunchSpec,
    ) -> Result<Box<dyn ToolRegistry>, ToolInvokeError> {
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        self.launches
            .lock()
            .expect("launch log")
            .push(launch.clone());
        if self.failure == Failure::Connect {
            return Err(ToolInvokeError::HandshakeTimeout {
                server: launch.server.clone(),
                timeout: launch.handshake_timeout,
            });
        }
        Ok(Box::new(CountingRegistry {
            counters: Arc::clone(&self.counters),
            failure: self.failure,
        }))
    }
}

fn server(script: &str) -> ServerConfig {
    ServerConfig {
        name: "analysis".into(),
        target: LaunchTarget::Script(PathBuf::from(script)),
        args: Vec::new(),
        env: HashMap::new(),
        workdir: None,
        handshake_timeout: Duration::from_secs(30),
    }
}

fn params(server: &ServerConfig) -> SessionParams<'_> {
    SessionParams {
        server,
        prompt: Some("analysis_system_prompt"),
        requester: Requester::new("005A", "TCK-1"),
        trace: Arc::new(MemoryTraceSink::new()),
    }
}

#[tokio::test]
async fn closes_once_after_successful_run() {
    let connector = CountingConnector::new(Failure::None);
    let config = server("server.py");

    let prompt = run_in_session(&connector, params(&config), |session| async move {
        assert!(!session.is_closed());
        assert_eq!(session.catalog().len(), 1);
        Ok(session.system_prompt().map(str::to_string))
    })
    .await
    .expect("run succeeds");

    assert_eq!(prompt.as_deref(), Some("You analyse Salesforce orgs."));
    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.shutdowns(), 1);

    let launches = connector.launches.lock().expect("launch log");
    assert_eq!(launches[0].program, PathBuf::from("python3"));
    assert_eq!(launches[0].env.get("USER_ID").map(String::as_str), Some("005A"));
    assert_eq!(launches[0].env.get("TICKET_ID").map(String::as_str), Some("TCK-1"));
}

/// Requests one tool call, then fails every later model call.
struct FailsAfterToolCall {
    calls: AtomicUsize,
}

#[async_trait]
impl ModelProvider for FailsAfterToolCall {
    async fn chat(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(ModelResponse::new(
                vec![ContentBlock::tool_use(
                    "toolu_1",
                    "read_file",
                    json!({"file_path": "force-app/main/default/classes/A.cls"}),
                )],
                StopReason::ToolUse,
            ));
        }
        Err(ModelError::invalid_response("scripted", "gateway went away"))
    }
}

#[tokio::test]
async fn closes_once_when_loop_fails_midway() {
    let connector = CountingConnector::new(Failure::None);
    let config = server("server.py");
    let agent = Agent::new(
        Arc::new(FailsAfterToolCall {
            calls: AtomicUsize::new(0),
        }),
        AgentOptions::new("scripted", "test-model"),
    );

    let result = run_in_session(&connector, params(&config), |session| async move {
        agent.run("Summarise class A", &session).await
    })
    .await;

    assert!(matches!(result, Err(AgentError::Gateway(_))));
    assert_eq!(connector.tool_calls(), 1);
    assert_eq!(connector.shutdowns(), 1);
}

#[tokio::test]
async fn closes_when_caller_abandons_the_run() {
    let connector = CountingConnector::new(Failure::None);
    let config = server("server.py");

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        run_in_session(&connector, params(&config), |_session| async {
            std::future::pending::<Result<(), AgentError>>().await
        }),
    )
    .await;
    assert!(abandoned.is_err());

    for _ in 0..20 {
        if connector.shutdowns() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(connector.shutdowns(), 1);
}

#[tokio::test]
async fn closes_once_when_run_panics() {
    let connector = CountingConnector::new(Failure::None);
    let config = server("server.py");

    let outcome = AssertUnwindSafe(run_in_session(
        &connector,
        params(&config),
        |_session| async move {
            if true {
                panic!("tool loop exploded");
            }
            Ok(())
        },
    ))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert_eq!(connector.shutdowns(), 1);
}

#[tokio::test]
async fn prompt_failure_releases_registry_before_returning() {
    let connector = CountingConnector::new(Failure::Prompt);
    let config = server("server.py");
    let mut ran = false;

    let result = run_in_session(&connector, params(&config), |_session| {
        ran = true;
        async { Ok(()) }
    })
    .await;

    assert!(matches!(
        result,
        Err(AgentError::Connection(ToolInvokeError::PromptUnavailable { .. }))
    ));
    assert!(!ran);
    assert_eq!(connector.shutdowns(), 1);
}

#[tokio::test]
async fn connect_failure_is_a_connection_error() {
    let connector = CountingConnector::new(Failure::Connect);
    let config = server("server.js");

    let result = run_in_session(&connector, params(&config), |_session| async { Ok(()) }).await;

    assert!(matches!(result, Err(AgentError::Connection(_))));
    assert_eq!(connector.shutdowns(), 0);
}

#[tokio::test]
async fn invalid_script_is_rejected_before_any_launch() {
    let connector = CountingConnector::new(Failure::None);
    let config = server("server.sh");

    let result = run_in_session(&connector, params(&config), |_session| async { Ok(()) }).await;

    assert!(matches!(result, Err(AgentError::Validation(_))));
    assert_eq!(connector.connects(), 0);
}
