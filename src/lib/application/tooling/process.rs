use super::error::ToolInvokeError;
use super::interface::{ToolCallOutput, ToolRegistry};
use super::launch::LaunchSpec;
use crate::constants::MCP_PROTOCOL_VERSION;
use crate::domain::types::ToolDescriptor;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, info, warn};

type PendingMap = HashMap<String, oneshot::Sender<Result<Value, ToolInvokeError>>>;

/// MCP client speaking newline-delimited JSON-RPC to a child process.
#[derive(Clone)]
pub struct McpProcess {
    inner: Arc<McpProcessInner>,
}

struct McpProcessInner {
    server: String,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    pending: AsyncMutex<PendingMap>,
    id_counter: AtomicU64,
    closed: AtomicBool,
}

impl McpProcess {
    /// Spawns the server and runs the `initialize` handshake under the
    /// launch's handshake timeout. The child is killed if the handshake fails.
    pub async fn spawn(launch: &LaunchSpec) -> Result<Self, ToolInvokeError> {
        let mut command = Command::new(&launch.program);
        command
            .args(&launch.args)
            .envs(&launch.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = &launch.workdir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: launch.server.clone(),
            source,
        })?;

        let inner = Arc::new(McpProcessInner {
            server: launch.server.clone(),
            child: AsyncMutex::new(None),
            writer: AsyncMutex::new(None),
            pending: AsyncMutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        });

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| inner.transport_error("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| inner.transport_error("failed to capture server stdout"))?;

        *inner.writer.lock().await = Some(BufWriter::new(stdin));
        *inner.child.lock().await = Some(child);

        tokio::spawn(McpProcessInner::reader_loop(Arc::downgrade(&inner), stdout));

        debug!(
            server = %launch.server,
            program = %launch.program.display(),
            "Spawned tool server, starting handshake"
        );

        match tokio::time::timeout(launch.handshake_timeout, inner.initialize_sequence()).await {
            Ok(Ok(())) => {
                info!(server = %launch.server, "Tool server handshake complete");
                Ok(Self { inner })
            }
            Ok(Err(err)) => {
                inner.shutdown().await;
                Err(err)
            }
            Err(_) => {
                inner.shutdown().await;
                Err(ToolInvokeError::HandshakeTimeout {
                    server: launch.server.clone(),
                    timeout: launch.handshake_timeout,
                })
            }
        }
    }

    pub fn server(&self) -> &str {
        &self.inner.server
    }
}

#[async_trait]
impl ToolRegistry for McpProcess {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.inner.send_request("tools/list", params).await?;
            tools.extend(parse_tool_descriptors(&result));
            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }
        debug!(server = %self.inner.server, count = tools.len(), "Fetched tool catalog");
        Ok(tools)
    }

    async fn get_prompt(&self, name: &str) -> Result<String, ToolInvokeError> {
        let result = self
            .inner
            .send_request("prompts/get", json!({ "name": name, "arguments": {} }))
            .await?;
        prompt_text(&result).ok_or_else(|| ToolInvokeError::PromptUnavailable {
            server: self.inner.server.clone(),
            prompt: name.to_string(),
        })
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallOutput, ToolInvokeError> {
        let params = json!({
            "name": name,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        let result = self.inner.send_request("tools/call", params).await?;
        Ok(tool_output(result))
    }

    async fn shutdown(&self) {
        self.inner.shutdown().await;
    }
}

impl McpProcessInner {
    async fn initialize_sequence(&self) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let init_result = self.send_request("initialize", params).await?;
        if let Some(version) = init_result.get("protocolVersion").and_then(Value::as_str) {
            debug!(server = %self.server, version, "Tool server negotiated protocol");
        }
        self.send_notification("notifications/initialized", json!({}))
            .await
    }

    /// Holds only a weak handle between lines, so dropping the last
    /// [`McpProcess`] drops the child and `kill_on_drop` ends the server.
    async fn reader_loop(inner: Weak<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let Some(this) = inner.upgrade() else {
                return;
            };
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.starts_with('{') {
                debug!(
                    server = %this.server,
                    line = trimmed,
                    "Skipping non-JSON output from tool server"
                );
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => {
                    if let Err(err) = this.process_inbound_message(value).await {
                        warn!(
                            server = %this.server,
                            %err,
                            "Failed to process message from tool server"
                        );
                    }
                }
                Err(source) => {
                    warn!(
                        server = %this.server,
                        line = trimmed,
                        %source,
                        "Received invalid JSON from tool server"
                    );
                }
            }
        }

        let Some(this) = inner.upgrade() else {
            return;
        };
        if !this.closed.load(Ordering::SeqCst) {
            warn!(server = %this.server, "Tool server closed its output stream");
        }
        this.shutdown().await;
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolInvokeError> {
        match (value.get("id").cloned(), value.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, value).await,
            (Some(id), false) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, true) => {
                self.handle_notification(&value);
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };

        let responder = self.pending.lock().await.remove(&key);
        let Some(sender) = responder else {
            debug!(
                server = %self.server,
                response_id = key,
                "Received response for unknown request"
            );
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => Err(ToolInvokeError::Rpc {
                server: self.server.clone(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            None => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if method == "ping" {
            return self.send_response(id, json!({})).await;
        }

        warn!(
            server = %self.server,
            method,
            "Tool server sent unsupported request"
        );
        let error = json!({
            "code": -32601,
            "message": format!("client does not implement method '{method}'"),
        });
        self.send_error(id, error).await
    }

    fn handle_notification(&self, value: &Value) {
        if let Some(method) = value.get("method").and_then(Value::as_str) {
            if method == "notifications/tools/list_changed" {
                info!(
                    server = %self.server,
                    "Tool server reported a changed tool list; keeping the session catalog"
                );
            } else {
                debug!(server = %self.server, method, "Received notification from tool server");
            }
        }
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ToolInvokeError::Closed {
                server: self.server.clone(),
            });
        }

        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolInvokeError::Cancelled {
                server: self.server.clone(),
            }),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn send_response(&self, id: Value, result: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result
        });
        self.write_message(&payload).await
    }

    async fn send_error(&self, id: Value, error: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": error
        });
        self.write_message(&payload).await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let mut encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.server.clone(),
                source,
            })?;
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or_else(|| ToolInvokeError::Terminated {
            server: self.server.clone(),
        })?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.transport_error(source.to_string()))
    }

    /// Drops the writer, kills the child and fails every pending request.
    async fn shutdown(&self) {
        let first = !self.closed.swap(true, Ordering::SeqCst);

        self.writer.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                debug!(
                    server = %self.server,
                    %err,
                    "Failed to kill tool server process (may have already exited)"
                );
            }
            let _ = child.wait().await;
        }

        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(ToolInvokeError::Terminated {
                server: self.server.clone(),
            }));
        }

        if first {
            debug!(server = %self.server, "Tool server released");
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.server.clone(),
            message: message.into(),
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn parse_tool_descriptors(result: &Value) -> Vec<ToolDescriptor> {
    let Some(array) = result.get("tools").and_then(Value::as_array) else {
        return Vec::new();
    };
    array
        .iter()
        .filter_map(|tool| {
            let name = tool.get("name").and_then(Value::as_str)?;
            Some(ToolDescriptor {
                name: name.to_string(),
                description: tool
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                input_schema: tool
                    .get("inputSchema")
                    .cloned()
                    .unwrap_or_else(|| json!({ "type": "object" })),
            })
        })
        .collect()
}

/// Text of the first prompt message. Content may be a single block or a list.
fn prompt_text(result: &Value) -> Option<String> {
    let content = result
        .get("messages")
        .and_then(Value::as_array)?
        .first()?
        .get("content")?;
    let block = match content {
        Value::Array(blocks) => blocks
            .iter()
            .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))?,
        other => other,
    };
    match block {
        Value::String(text) => Some(text.clone()),
        other => other.get("text").and_then(Value::as_str).map(str::to_string),
    }
}

fn tool_output(result: Value) -> ToolCallOutput {
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let content = match result {
        Value::Object(mut map) => map.remove("content").unwrap_or(Value::Object(map)),
        other => other,
    };
    ToolCallOutput { content, is_error }
}
