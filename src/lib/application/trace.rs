//! Per-requester activity trace.
//!
//! Every text fragment the model produces and every tool invocation the loop
//! performs is appended to a [`TraceSink`]. The file sink writes one JSON
//! object per line to `<dir>/user_<user_id>/agent_<YYYYMMDD>.log`.

use crate::domain::types::Requester;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to write trace file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode trace entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    Text { text: String },
    ToolInvocation { name: String, arguments: Value },
    ToolResult { tool_use_id: String, is_error: bool },
    Summary { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub ticket_id: String,
    #[serde(flatten)]
    pub event: TraceEvent,
}

impl TraceEntry {
    pub fn now(requester: &Requester, event: TraceEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            user_id: requester.user_id.clone(),
            ticket_id: requester.ticket_id.clone(),
            event,
        }
    }
}

#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn record(&self, entry: TraceEntry) -> Result<(), TraceError>;
}

/// Layout of the trace directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceDirectory {
    root: PathBuf,
}

impl TraceDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, user_id: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("user_{}", sanitize(user_id)))
            .join(format!("agent_{}.log", date.format("%Y%m%d")))
    }
}

/// Keeps caller-supplied ids from escaping the trace directory.
fn sanitize(user_id: &str) -> String {
    let cleaned: String = user_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

/// Appends JSON lines to per-requester, per-day files.
///
/// Writers to the same file are serialized; different files never contend.
pub struct FileTraceSink {
    directory: TraceDirectory,
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl FileTraceSink {
    pub fn new(directory: TraceDirectory) -> Self {
        Self {
            directory,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn directory(&self) -> &TraceDirectory {
        &self.directory
    }

    /// Locks nobody holds are dropped first, so the map only tracks files
    /// with a write in flight.
    fn lock_for(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(
            locks
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}

#[async_trait]
impl TraceSink for FileTraceSink {
    async fn record(&self, entry: TraceEntry) -> Result<(), TraceError> {
        let path = self
            .directory
            .path_for(&entry.user_id, entry.timestamp.date_naive());
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;

        let io_error = |source: std::io::Error| TraceError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)
    }
}

/// Collects entries in memory.
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    entries: Mutex<Vec<TraceEntry>>,
}

impl MemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.entries().into_iter().map(|entry| entry.event).collect()
    }
}

#[async_trait]
impl TraceSink for MemoryTraceSink {
    async fn record(&self, entry: TraceEntry) -> Result<(), TraceError> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn paths_are_keyed_by_user_and_day() {
        let dir = TraceDirectory::new("/var/log/agents");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            dir.path_for("005xx01", date),
            PathBuf::from("/var/log/agents/user_005xx01/agent_20240309.log")
        );
        assert_eq!(
            dir.path_for("../../etc", date),
            PathBuf::from("/var/log/agents/user_______etc/agent_20240309.log")
        );
    }

    #[tokio::test]
    async fn file_sink_appends_json_lines() {
        let temp = tempdir().expect("tempdir");
        let sink = FileTraceSink::new(TraceDirectory::new(temp.path()));
        let requester = Requester::new("u1", "T-1");

        sink.record(TraceEntry::now(
            &requester,
            TraceEvent::Text {
                text: "Looking at the file".into(),
            },
        ))
        .await
        .expect("first write");
        let second = TraceEntry::now(
            &requester,
            TraceEvent::ToolInvocation {
                name: "read_file".into(),
                arguments: json!({"file_path": "/a.txt"}),
            },
        );
        let path = sink
            .directory()
            .path_for("u1", second.timestamp.date_naive());
        sink.record(second).await.expect("second write");

        let contents = std::fs::read_to_string(&path).expect("trace file exists");
        let lines: Vec<Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "text");
        assert_eq!(lines[0]["ticket_id"], "T-1");
        assert_eq!(lines[1]["kind"], "tool_invocation");
        assert_eq!(lines[1]["arguments"]["file_path"], "/a.txt");
    }

    #[tokio::test]
    async fn concurrent_writers_do_not_interleave_lines() {
        let temp = tempdir().expect("tempdir");
        let sink = Arc::new(FileTraceSink::new(TraceDirectory::new(temp.path())));

        let mut handles = Vec::new();
        for index in 0..16 {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                let requester = Requester::new(format!("user{}", index % 2), "T");
                sink.record(TraceEntry::now(
                    &requester,
                    TraceEvent::Text {
                        text: "x".repeat(512),
                    },
                ))
                .await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("write");
        }

        let today = Utc::now().date_naive();
        for user in ["user0", "user1"] {
            let path = sink.directory().path_for(user, today);
            let contents = std::fs::read_to_string(&path).expect("trace file");
            assert_eq!(contents.lines().count(), 8);
            for line in contents.lines() {
                serde_json::from_str::<TraceEntry>(line).expect("well-formed line");
            }
        }
    }

    #[tokio::test]
    async fn file_locks_are_released_after_writes() {
        let temp = tempdir().expect("tempdir");
        let sink = FileTraceSink::new(TraceDirectory::new(temp.path()));

        for index in 0..200 {
            let requester = Requester::new(format!("user{index}"), "T");
            sink.record(TraceEntry::now(
                &requester,
                TraceEvent::Text { text: "x".into() },
            ))
            .await
            .expect("write");
        }

        let tracked = sink.locks.lock().expect("locks").len();
        assert!(tracked <= 1, "{tracked} file locks kept after sequential writes");
    }
}
