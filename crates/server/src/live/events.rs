//! Frames exchanged over the live WebSocket.

use chrono::{DateTime, Utc};
use convo_live_core::{ConversationState, IndexedMessage, Message};
use serde::{Deserialize, Serialize};

/// Server → client frame. Serialized as `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PushMessage {
    Connected(ConnectedData),
    NewMessage(NewMessageData),
    ConversationStateChange(StateChangeData),
    DataRefresh(DataRefreshData),
    Pong(PongData),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedData {
    pub subscriber_id: u64,
    pub conversation_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageData {
    pub conversation_id: String,
    pub message: Message,
    pub metadata: NewMessageMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageMetadata {
    pub timestamp: DateTime<Utc>,
    pub total_messages: usize,
    pub has_tools: bool,
    pub tool_count: usize,
    pub message_index: usize,
    pub is_updated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangeData {
    pub conversation_id: String,
    pub state: ConversationState,
    pub previous_state: Option<ConversationState>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRefreshData {
    pub conversation_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PongData {
    pub timestamp: DateTime<Utc>,
}

impl PushMessage {
    pub fn new_message(
        conversation_id: &str,
        item: &IndexedMessage,
        total_messages: usize,
        is_updated: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let tool_count = item.message.tool_use_count();
        Self::NewMessage(NewMessageData {
            conversation_id: conversation_id.to_string(),
            message: item.message.clone(),
            metadata: NewMessageMetadata {
                timestamp: now,
                total_messages,
                has_tools: tool_count > 0,
                tool_count,
                message_index: item.index,
                is_updated,
            },
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::NewMessage(_) => "new_message",
            Self::ConversationStateChange(_) => "conversation_state_change",
            Self::DataRefresh(_) => "data_refresh",
            Self::Pong(_) => "pong",
        }
    }
}

/// Client → server frame. Unknown types are ignored by the socket loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}
