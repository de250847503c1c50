// crates/core/src/diff.rs
//! Change detection between two parses of the same conversation.
//!
//! A fingerprint captures the parts of a message that can change after it
//! was first written (late tool results, streamed text). Comparing the
//! previous fingerprints against a fresh parse yields the appended suffix
//! and the earlier entries that were mutated in place.

use crate::types::{Message, MessageContent, Role};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentShape {
    Text { len: usize },
    Blocks { count: usize, text_len: usize },
}

/// Compact summary of one message. Equal fingerprints mean "unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub id: String,
    pub role: Role,
    pub shape: ContentShape,
    pub tool_result_count: usize,
    pub has_tool_use: bool,
}

pub fn fingerprint(message: &Message) -> Fingerprint {
    let shape = match &message.content {
        MessageContent::Text(text) => ContentShape::Text {
            len: text.chars().count(),
        },
        MessageContent::Blocks(blocks) => ContentShape::Blocks {
            count: blocks.len(),
            text_len: message.text_len(),
        },
    };
    Fingerprint {
        id: message.id.clone(),
        role: message.role.clone(),
        shape,
        tool_result_count: message.tool_results.len(),
        has_tool_use: message.has_tool_use(),
    }
}

pub fn fingerprints(messages: &[Message]) -> Vec<Fingerprint> {
    messages.iter().map(fingerprint).collect()
}

/// A message together with its position in the parsed list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexedMessage {
    pub index: usize,
    pub message: Message,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    /// Messages beyond the previously known count.
    pub new: Vec<IndexedMessage>,
    /// Previously seen positions whose fingerprint changed.
    pub updated: Vec<IndexedMessage>,
}

impl ChangeSet {
    /// Drop updates for ids that are also reported as new, so a message is
    /// never announced twice in one pass.
    pub fn merge(mut self) -> Self {
        if self.new.is_empty() || self.updated.is_empty() {
            return self;
        }
        let new_ids: HashSet<&str> = self.new.iter().map(|m| m.message.id.as_str()).collect();
        let updated = std::mem::take(&mut self.updated)
            .into_iter()
            .filter(|m| !new_ids.contains(m.message.id.as_str()))
            .collect();
        self.updated = updated;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.updated.len()
    }
}

/// Compare a fresh parse against the last recorded baseline.
///
/// Positions `>= previous_count` are new. Positions below both counts are
/// updated when their fingerprint differs, or when the baseline has no
/// fingerprint for them.
pub fn diff(previous_count: usize, previous: &[Fingerprint], messages: &[Message]) -> ChangeSet {
    let overlap = previous_count.min(messages.len());

    let updated = messages[..overlap]
        .iter()
        .enumerate()
        .filter(|(index, message)| match previous.get(*index) {
            Some(prev) => *prev != fingerprint(message),
            None => true,
        })
        .map(|(index, message)| IndexedMessage {
            index,
            message: message.clone(),
        })
        .collect();

    let new = messages[overlap..]
        .iter()
        .enumerate()
        .map(|(offset, message)| IndexedMessage {
            index: overlap + offset,
            message: message.clone(),
        })
        .collect();

    ChangeSet { new, updated }
}

/// What the orchestrator last reported for one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    pub count: usize,
    pub fingerprints: Vec<Fingerprint>,
}

impl Baseline {
    pub fn from_messages(messages: &[Message]) -> Self {
        Self {
            count: messages.len(),
            fingerprints: fingerprints(messages),
        }
    }

    pub fn diff(&self, messages: &[Message]) -> ChangeSet {
        diff(self.count, &self.fingerprints, messages)
    }
}
