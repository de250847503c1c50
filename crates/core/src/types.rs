// crates/core/src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Message role in a conversation.
///
/// Anything that is not `user` or `assistant` is kept verbatim so it
/// round-trips to viewers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other(other) => other,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::User => "user".to_string(),
            Role::Assistant => "assistant".to_string(),
            Role::Other(other) => other,
        }
    }
}

/// A typed block inside structured message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    ToolUse {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default)]
        content: serde_json::Value,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Other,
}

/// Message content: either a plain string or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

/// A tool result correlated back onto the message that requested it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_use_id: String,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, content: MessageContent) -> Self {
        Self {
            id: id.into(),
            role,
            timestamp: None,
            content,
            model: None,
            tool_results: Vec::new(),
        }
    }

    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, Role::User, MessageContent::Text(text.into()))
    }

    pub fn assistant(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, Role::Assistant, MessageContent::Text(text.into()))
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_blocks(mut self, blocks: Vec<ContentBlock>) -> Self {
        self.content = MessageContent::Blocks(blocks);
        self
    }

    pub fn with_tool_result(mut self, result: ToolResult) -> Self {
        self.tool_results.push(result);
        self
    }

    /// Content blocks, or an empty slice for plain-text content.
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks,
            MessageContent::Text(_) => &[],
        }
    }

    /// `(id, name)` of every tool invocation in this message, in order.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blocks().iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, .. } => Some((id.as_str(), name.as_str())),
            _ => None,
        })
    }

    pub fn has_tool_use(&self) -> bool {
        self.tool_uses().next().is_some()
    }

    pub fn tool_use_count(&self) -> usize {
        self.tool_uses().count()
    }

    /// Total character length of the textual content.
    pub fn text_len(&self) -> usize {
        match &self.content {
            MessageContent::Text(text) => text.chars().count(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => text.chars().count(),
                    ContentBlock::Thinking { thinking } => thinking.chars().count(),
                    _ => 0,
                })
                .sum(),
        }
    }
}

/// Result of parsing one conversation file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedConversation {
    pub messages: Vec<Message>,
    /// Non-blank lines that failed to decode as JSON.
    pub skipped_lines: usize,
}

/// Conversation metadata as produced by a directory scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// File stem of the JSONL file.
    pub id: String,
    pub file_path: PathBuf,
    /// Encoded project directory name, as stored on disk.
    pub project: String,
    pub project_display_name: String,
    /// Decoded working directory of the project.
    pub project_path: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub message_count: usize,
}

/// A page of messages sorted ascending by timestamp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedMessages {
    pub messages: Vec<Message>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl PaginatedMessages {
    /// Sort ascending by timestamp and slice `[offset, offset + limit)`.
    ///
    /// The sort is stable; untimestamped messages sort first, in file order.
    pub fn from_messages(mut messages: Vec<Message>, offset: usize, limit: usize) -> Self {
        messages.sort_by_key(|m| m.timestamp);
        let total = messages.len();
        let messages: Vec<Message> = messages.into_iter().skip(offset).take(limit).collect();
        let has_more = offset + messages.len() < total;
        Self {
            messages,
            total,
            offset,
            limit,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_760_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(
            serde_json::to_string(&Role::Other("system".into())).unwrap(),
            "\"system\""
        );
    }

    #[test]
    fn test_role_deserialization() {
        let user: Role = serde_json::from_str("\"user\"").unwrap();
        let other: Role = serde_json::from_str("\"tool\"").unwrap();
        assert_eq!(user, Role::User);
        assert_eq!(other, Role::Other("tool".into()));
    }

    #[test]
    fn test_content_blocks_deserialization() {
        let json = r#"[{"type":"text","text":"Hello"},{"type":"tool_use","id":"t1","name":"Read","input":{"path":"a"}},{"type":"image","source":{}}]"#;
        let content: MessageContent = serde_json::from_str(json).unwrap();
        let MessageContent::Blocks(blocks) = content else {
            panic!("Expected blocks");
        };
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[1], ContentBlock::ToolUse { id, name, .. } if id == "t1" && name == "Read"));
        assert_eq!(blocks[2], ContentBlock::Other);
    }

    #[test]
    fn test_message_tool_uses() {
        let msg = Message::assistant("m1", "").with_blocks(vec![
            ContentBlock::Text { text: "Let me look".into() },
            ContentBlock::ToolUse {
                id: "t1".into(),
                name: "Read".into(),
                input: serde_json::json!({}),
            },
            ContentBlock::ToolUse {
                id: "t2".into(),
                name: "Bash".into(),
                input: serde_json::json!({}),
            },
        ]);
        assert!(msg.has_tool_use());
        assert_eq!(msg.tool_use_count(), 2);
        assert_eq!(msg.text_len(), "Let me look".len());
        assert!(!Message::user("u", "hi").has_tool_use());
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let msg = Message::assistant("m1", "done").with_tool_result(ToolResult {
            tool_use_id: "t1".into(),
            content: serde_json::json!("ok"),
            is_error: false,
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["toolResults"][0]["toolUseId"], "t1");
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn test_paginated_sorts_before_slicing() {
        let messages = vec![
            Message::user("c", "third").with_timestamp(ts(30)),
            Message::user("a", "first").with_timestamp(ts(10)),
            Message::user("b", "second").with_timestamp(ts(20)),
        ];
        let page = PaginatedMessages::from_messages(messages, 0, 2);
        let ids: Vec<&str> = page.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(page.total, 3);
        assert!(page.has_more);
    }

    #[test]
    fn test_paginated_beyond_end() {
        let messages = vec![Message::user("a", "x").with_timestamp(ts(1))];
        let page = PaginatedMessages::from_messages(messages, 5, 10);
        assert!(page.messages.is_empty());
        assert!(!page.has_more);
    }
}
