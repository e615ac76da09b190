//! Conversation data model shared by the agent loop, the model clients and the
//! tool registry.
//!
//! A [`Transcript`] is an ordered list of [`Turn`]s. Turn content is either a
//! plain string or a sequence of [`ContentBlock`]s; the block enum mirrors the
//! `type`-tagged shape used on the wire so it can be logged and serialized
//! without a translation layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single fragment of turn content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: Value, is_error: bool) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content,
            is_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: TurnContent::Blocks(blocks),
        }
    }

    /// A `user` turn carrying a single tool result.
    pub fn tool_result(result: ContentBlock) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Blocks(vec![result]),
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            TurnContent::Text(_) => &[],
            TurnContent::Blocks(blocks) => blocks,
        }
    }
}

/// Ordered turn history for one conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Checks that every tool result answers a tool use in the turn directly
    /// before it, and that call ids are unique across the transcript.
    pub fn verify_tool_pairing(&self) -> Result<(), String> {
        let mut seen_ids = HashSet::new();
        for (index, turn) in self.turns.iter().enumerate() {
            for block in turn.blocks() {
                match block {
                    ContentBlock::ToolUse { id, .. } => {
                        if !seen_ids.insert(id.as_str()) {
                            return Err(format!("duplicate tool call id '{id}' at turn {index}"));
                        }
                    }
                    ContentBlock::ToolResult { tool_use_id, .. } => {
                        let previous = index
                            .checked_sub(1)
                            .and_then(|prev| self.turns.get(prev))
                            .filter(|prev| prev.role == Role::Assistant);
                        let Some(previous) = previous else {
                            return Err(format!(
                                "tool result '{tool_use_id}' at turn {index} does not follow an assistant turn"
                            ));
                        };
                        let matches = previous
                            .blocks()
                            .iter()
                            .filter(|candidate| {
                                matches!(candidate, ContentBlock::ToolUse { id, .. } if id == tool_use_id)
                            })
                            .count();
                        if matches != 1 {
                            return Err(format!(
                                "tool result '{tool_use_id}' at turn {index} matches {matches} tool calls"
                            ));
                        }
                    }
                    ContentBlock::Text { .. } => {}
                }
            }
        }
        Ok(())
    }
}

/// Tool metadata advertised by a registry and forwarded to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

/// The tools available to one session. Fixed once fetched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    tools: Vec<ToolDescriptor>,
}

impl Catalog {
    pub fn new(tools: Vec<ToolDescriptor>) -> Self {
        let mut names = HashSet::new();
        let mut unique = Vec::with_capacity(tools.len());
        for tool in tools {
            if names.insert(tool.name.clone()) {
                unique.push(tool);
            } else {
                warn!(tool = %tool.name, "Dropping duplicate tool advertised by registry");
            }
        }
        Self { tools: unique }
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Who a session runs on behalf of. Used for attribution only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: String,
    pub ticket_id: String,
}

impl Requester {
    pub fn new(user_id: impl Into<String>, ticket_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ticket_id: ticket_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: None,
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn content_blocks_use_type_tag() {
        let block = ContentBlock::tool_use("call-1", "read_file", json!({"file_path": "/a.txt"}));
        let value = serde_json::to_value(&block).expect("serializes");
        assert_eq!(value["type"], "tool_use");
        assert_eq!(value["name"], "read_file");

        let result = ContentBlock::tool_result("call-1", json!("hello"), false);
        let value = serde_json::to_value(&result).expect("serializes");
        assert_eq!(value["type"], "tool_result");
        assert!(value.get("is_error").is_none());
    }

    #[test]
    fn turn_content_accepts_plain_string() {
        let turn: Turn =
            serde_json::from_value(json!({"role": "user", "content": "list files"})).unwrap();
        assert_eq!(turn.content, TurnContent::Text("list files".into()));
        assert!(turn.blocks().is_empty());
    }

    #[test]
    fn pairing_accepts_result_after_matching_call() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user_text("list files"));
        transcript.push(Turn::assistant(vec![
            ContentBlock::text("Reading"),
            ContentBlock::tool_use("call-1", "read_file", json!({})),
        ]));
        transcript.push(Turn::tool_result(ContentBlock::tool_result(
            "call-1",
            json!("hello"),
            false,
        )));
        assert!(transcript.verify_tool_pairing().is_ok());
    }

    #[test]
    fn pairing_rejects_orphan_result() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user_text("list files"));
        transcript.push(Turn::tool_result(ContentBlock::tool_result(
            "call-9",
            json!("hello"),
            false,
        )));
        assert!(transcript.verify_tool_pairing().is_err());
    }

    #[test]
    fn pairing_rejects_mismatched_id() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::assistant(vec![ContentBlock::tool_use(
            "call-1",
            "read_file",
            json!({}),
        )]));
        transcript.push(Turn::tool_result(ContentBlock::tool_result(
            "call-2",
            json!("hello"),
            false,
        )));
        let err = transcript.verify_tool_pairing().unwrap_err();
        assert!(err.contains("call-2"));
    }

    #[test]
    fn catalog_drops_duplicate_names() {
        let catalog = Catalog::new(vec![
            descriptor("read_file"),
            descriptor("retrieve_metadata"),
            descriptor("read_file"),
        ]);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("retrieve_metadata"));
        assert!(!catalog.contains("write_file"));
    }
}
