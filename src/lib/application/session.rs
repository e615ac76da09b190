//! Per-request session around one tool server.
//!
//! A [`Session`] owns the registry connection together with what was fetched
//! from it at startup (catalog and system prompt). [`run_in_session`] is the
//! only intended way to use one: it opens the session, runs the caller's
//! future, and releases the registry exactly once on every exit path.

use crate::application::agent::{AgentError, ToolError};
use crate::application::tooling::{
    LaunchSpec, RegistryConnector, ToolInvokeError, ToolRegistry,
};
use crate::application::trace::{TraceEntry, TraceEvent, TraceSink};
use crate::config::ServerConfig;
use crate::domain::types::{Catalog, ContentBlock, Requester};
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

pub struct Session {
    registry: Box<dyn ToolRegistry>,
    catalog: Catalog,
    system_prompt: Option<String>,
    requester: Requester,
    trace: Arc<dyn TraceSink>,
    closed: AtomicBool,
}

impl Session {
    /// Launches the registry, then fetches the catalog and the named system
    /// prompt. The registry is released before any fetch error is returned.
    pub async fn open(
        connector: &dyn RegistryConnector,
        launch: &LaunchSpec,
        prompt: Option<&str>,
        requester: Requester,
        trace: Arc<dyn TraceSink>,
    ) -> Result<Self, ToolInvokeError> {
        let registry = connector.connect(launch).await?;

        let fetched = async {
            let tools = registry.list_tools().await?;
            let system_prompt = match prompt {
                Some(name) => Some(registry.get_prompt(name).await?),
                None => None,
            };
            Ok::<_, ToolInvokeError>((tools, system_prompt))
        }
        .await;

        let (tools, system_prompt) = match fetched {
            Ok(values) => values,
            Err(err) => {
                warn!(server = %launch.server, %err, "Session setup failed, releasing tool server");
                registry.shutdown().await;
                return Err(err);
            }
        };

        let catalog = Catalog::new(tools);
        info!(
            server = %launch.server,
            user_id = %requester.user_id,
            ticket_id = %requester.ticket_id,
            tools = catalog.len(),
            has_system_prompt = system_prompt.is_some(),
            "Session opened"
        );

        Ok(Self {
            registry,
            catalog,
            system_prompt,
            requester,
            trace,
            closed: AtomicBool::new(false),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Appends to the requester's trace. Write failures are logged, not raised.
    pub async fn record(&self, event: TraceEvent) {
        if let Err(err) = self
            .trace
            .record(TraceEntry::now(&self.requester, event))
            .await
        {
            warn!(user_id = %self.requester.user_id, %err, "Failed to write trace entry");
        }
    }

    /// Runs one tool call and returns the `tool_result` block answering `id`.
    /// Failures are folded into an error result instead of being raised.
    pub async fn invoke_tool(&self, id: &str, name: &str, input: Value) -> ContentBlock {
        self.record(TraceEvent::ToolInvocation {
            name: name.to_string(),
            arguments: input.clone(),
        })
        .await;

        let result = if self.catalog.contains(name) {
            self.registry
                .call_tool(name, input)
                .await
                .map_err(|source| ToolError::Execution {
                    tool: name.to_string(),
                    source,
                })
        } else {
            Err(ToolError::UnknownTool(name.to_string()))
        };

        let block = match result {
            Ok(output) => {
                debug!(tool = %name, is_error = output.is_error, "Tool call completed");
                ContentBlock::tool_result(id, output.content, output.is_error)
            }
            Err(err) => {
                warn!(tool = %name, %err, "Tool call failed");
                ContentBlock::tool_result(id, Value::String(err.user_message()), true)
            }
        };

        if let ContentBlock::ToolResult { is_error, .. } = &block {
            self.record(TraceEvent::ToolResult {
                tool_use_id: id.to_string(),
                is_error: *is_error,
            })
            .await;
        }
        block
    }

    /// Releases the registry. Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.shutdown().await;
        debug!(user_id = %self.requester.user_id, "Session closed");
    }
}

/// Everything needed to open a session for one request.
pub struct SessionParams<'a> {
    pub server: &'a ServerConfig,
    pub prompt: Option<&'a str>,
    pub requester: Requester,
    pub trace: Arc<dyn TraceSink>,
}

/// Opens a session, runs `run` with it and closes it exactly once, whether
/// `run` succeeds, fails or panics. Panics are resumed after the close.
///
/// Launch validation happens before any process is started.
pub async fn run_in_session<T, F, Fut>(
    connector: &dyn RegistryConnector,
    params: SessionParams<'_>,
    run: F,
) -> Result<T, AgentError>
where
    F: FnOnce(Arc<Session>) -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let launch = LaunchSpec::resolve(params.server, &params.requester)?;
    let session = Arc::new(
        Session::open(
            connector,
            &launch,
            params.prompt,
            params.requester,
            params.trace,
        )
        .await?,
    );

    let guard = CloseOnDrop(Arc::clone(&session));
    let outcome = AssertUnwindSafe(async { run(Arc::clone(&session)).await })
        .catch_unwind()
        .await;
    session.close().await;
    drop(guard);

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Closes the session from a spawned task when the future driving
/// [`run_in_session`] is dropped before reaching its own close.
struct CloseOnDrop(Arc<Session>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        if self.0.is_closed() {
            return;
        }
        let session = Arc::clone(&self.0);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(user_id = %session.requester.user_id, "Session abandoned, closing in background");
                handle.spawn(async move { session.close().await });
            }
            Err(_) => warn!(
                user_id = %session.requester.user_id,
                "Session abandoned outside a runtime, tool server killed on drop"
            ),
        }
    }
}
