// crates/core/src/parser.rs
//! JSONL parser for conversation log files.
//!
//! Every line is an independent JSON record. Lines that fail to decode are
//! dropped (a writer may be mid-append), records without a role are not
//! messages and are ignored, and tool results are correlated back onto the
//! assistant message that issued the matching tool invocation.

use crate::cache::SnapshotCache;
use crate::error::ParseError;
use crate::types::*;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Log the first malformed line of a parse and then every Nth one.
const MALFORMED_LOG_EVERY: usize = 50;

enum LineOutcome {
    Message(Message),
    Ignored,
}

/// Parse the full contents of a conversation file.
///
/// Pure and deterministic: the same input always yields the same output.
pub fn parse_conversation_str(content: &str) -> ParsedConversation {
    parse_conversation_bytes(content.as_bytes())
}

/// Parse raw file bytes. Lines are split on `\n` before any UTF-8 check, so
/// a line with invalid bytes (e.g. a write cut mid-character) is skipped
/// like any other malformed line.
pub fn parse_conversation_bytes(content: &[u8]) -> ParsedConversation {
    let mut messages: Vec<Message> = Vec::new();
    let mut skipped_lines = 0usize;

    for (idx, raw_line) in content.split(|b| *b == b'\n').enumerate() {
        let line_number = idx + 1;
        let line = raw_line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_slice(line) {
            Ok(v) => v,
            Err(e) => {
                skipped_lines += 1;
                if skipped_lines == 1 || skipped_lines % MALFORMED_LOG_EVERY == 0 {
                    debug!(
                        line = line_number,
                        skipped_total = skipped_lines,
                        error = %e,
                        "Skipping malformed JSONL line"
                    );
                }
                continue;
            }
        };

        match decode_record(&value, line_number) {
            LineOutcome::Message(message) => messages.push(message),
            LineOutcome::Ignored => {}
        }
    }

    correlate_tool_results(&mut messages);

    ParsedConversation {
        messages,
        skipped_lines,
    }
}

/// Read and parse a conversation file.
///
/// A missing file is an empty conversation, not an error.
pub async fn parse_conversation(file_path: &Path) -> Result<ParsedConversation, ParseError> {
    let content = match tokio::fs::read(file_path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ParsedConversation::default());
        }
        Err(e) => return Err(ParseError::io(file_path, e)),
    };

    let parsed = parse_conversation_bytes(&content);
    if parsed.skipped_lines > 0 {
        debug!(
            path = %file_path.display(),
            skipped = parsed.skipped_lines,
            messages = parsed.messages.len(),
            "Parsed conversation with skipped lines"
        );
    }
    Ok(parsed)
}

/// Cache-backed parse keyed by path + modification time.
///
/// Unchanged files are served from `cache`; anything else is re-parsed and
/// stored under the mtime observed before reading.
pub async fn get_parsed_conversation(
    cache: &SnapshotCache<Vec<Message>>,
    file_path: &Path,
) -> Result<Arc<Vec<Message>>, ParseError> {
    let modified = match tokio::fs::metadata(file_path).await {
        Ok(meta) => meta.modified().map_err(|e| ParseError::io(file_path, e))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            cache.invalidate(file_path);
            return Ok(Arc::new(Vec::new()));
        }
        Err(e) => return Err(ParseError::io(file_path, e)),
    };

    if let Some(messages) = cache.get(file_path, modified) {
        return Ok(messages);
    }

    let parsed = parse_conversation(file_path).await?;
    Ok(cache.put(file_path, modified, parsed.messages))
}

/// Turn one decoded record into a message.
///
/// Accepts both the envelope shape (`{type, uuid, timestamp, message: {role,
/// content, ...}}`) and the flat shape (`{role, timestamp, content}`).
fn decode_record(value: &Value, line_number: usize) -> LineOutcome {
    if value.get("isMeta").and_then(Value::as_bool) == Some(true) {
        return LineOutcome::Ignored;
    }

    let inner = value.get("message").filter(|m| m.is_object());
    let field = |name: &str| inner.and_then(|m| m.get(name)).or_else(|| value.get(name));

    let Some(role) = field("role").and_then(Value::as_str) else {
        return LineOutcome::Ignored;
    };

    // One assistant turn is split across lines that share `message.id`, so
    // the per-line uuid comes first.
    let id = value
        .get("uuid")
        .or_else(|| inner.and_then(|m| m.get("id")))
        .or_else(|| value.get("id"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| format!("line-{line_number}"));

    let timestamp = value
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);

    let model = inner
        .and_then(|m| m.get("model"))
        .and_then(Value::as_str)
        .map(String::from);

    // A flat tool-result record is normalized into a single tool_result block
    // so correlation only has to look at blocks.
    let flat_result_id = value
        .get("tool_use_id")
        .or_else(|| value.get("toolUseId"))
        .and_then(Value::as_str);

    let content = match flat_result_id {
        Some(tool_use_id) => MessageContent::Blocks(vec![ContentBlock::ToolResult {
            tool_use_id: tool_use_id.to_string(),
            content: field("content").cloned().unwrap_or(Value::Null),
            is_error: value.get("is_error").and_then(Value::as_bool).unwrap_or(false),
        }]),
        None => decode_content(field("content")),
    };

    let mut message = Message::new(id, Role::from(role), content);
    message.timestamp = timestamp;
    message.model = model;
    LineOutcome::Message(message)
}

/// Decode content leniently: unknown or malformed blocks become `Other`
/// rather than failing the whole line.
fn decode_content(content: Option<&Value>) -> MessageContent {
    match content {
        Some(Value::String(text)) => MessageContent::Text(text.clone()),
        Some(Value::Array(items)) => MessageContent::Blocks(
            items
                .iter()
                .map(|item| {
                    serde_json::from_value::<ContentBlock>(item.clone()).unwrap_or(ContentBlock::Other)
                })
                .collect(),
        ),
        _ => MessageContent::default(),
    }
}

/// Attach each tool result to the assistant message whose tool invocation it
/// answers. Only results that appear in a later message are considered.
fn correlate_tool_results(messages: &mut [Message]) {
    let mut results: HashMap<String, (usize, ToolResult)> = HashMap::new();
    for (idx, message) in messages.iter().enumerate() {
        for block in message.blocks() {
            if let ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } = block
            {
                if tool_use_id.is_empty() {
                    continue;
                }
                results.entry(tool_use_id.clone()).or_insert_with(|| {
                    (
                        idx,
                        ToolResult {
                            tool_use_id: tool_use_id.clone(),
                            content: content.clone(),
                            is_error: *is_error,
                        },
                    )
                });
            }
        }
    }

    if results.is_empty() {
        return;
    }

    for (idx, message) in messages.iter_mut().enumerate() {
        if message.role != Role::Assistant {
            continue;
        }
        let attached: Vec<ToolResult> = message
            .tool_uses()
            .filter_map(|(id, _)| results.get(id))
            .filter(|(result_idx, _)| *result_idx > idx)
            .map(|(_, result)| result.clone())
            .collect();
        message.tool_results.extend(attached);
    }
}

/// Parse an ISO 8601 timestamp, tolerating a missing offset.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
