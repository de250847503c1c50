// crates/core/src/state.rs
//! Best-effort lifecycle state of a conversation.
//!
//! The state is derived from the file's modification time and the most
//! recent message. Rules are evaluated in order and the first match wins;
//! file recency always comes first.

use crate::types::{Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationState {
    #[serde(rename = "working")]
    Working,
    #[serde(rename = "awaiting response")]
    AwaitingResponse,
    #[serde(rename = "typing")]
    Typing,
    #[serde(rename = "recently active")]
    RecentlyActive,
    #[serde(rename = "awaiting input")]
    AwaitingInput,
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "inactive")]
    Inactive,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::AwaitingResponse => "awaiting response",
            Self::Typing => "typing",
            Self::RecentlyActive => "recently active",
            Self::AwaitingInput => "awaiting input",
            Self::Idle => "idle",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping of [`ConversationState`] used for list filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Active,
    Recent,
    Inactive,
}

impl ActivityLevel {
    pub fn from_state(state: ConversationState) -> Self {
        match state {
            ConversationState::Working
            | ConversationState::AwaitingResponse
            | ConversationState::AwaitingInput
            | ConversationState::Typing => Self::Active,
            ConversationState::RecentlyActive | ConversationState::Idle => Self::Recent,
            ConversationState::Inactive => Self::Inactive,
        }
    }
}

/// External evidence about the conversation beyond its file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityHint {
    /// An assistant process is known to be running for this conversation.
    pub process_running: bool,
}

/// Inputs a rule looks at.
#[derive(Debug, Clone)]
pub struct Facts<'a> {
    pub file_age: Duration,
    pub message_count: usize,
    pub last_role: Option<&'a Role>,
    /// Age of the last message, when it carries a timestamp.
    pub last_message_age: Option<Duration>,
}

impl Facts<'_> {
    fn last_is(&self, role: &Role) -> bool {
        self.last_message_age.is_some() && self.last_role == Some(role)
    }

    fn message_younger_than(&self, limit: Duration) -> bool {
        self.last_message_age.is_some_and(|age| age < limit)
    }
}

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&Facts<'_>) -> bool,
    pub state: ConversationState,
}

const fn mins(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

/// Ordered rule table. The last rule always matches.
pub static RULES: &[Rule] = &[
    Rule {
        name: "file_just_written",
        applies: |f| f.file_age < mins(1),
        state: ConversationState::Working,
    },
    Rule {
        name: "empty_recent",
        applies: |f| f.message_count == 0 && f.file_age < mins(5),
        state: ConversationState::Idle,
    },
    Rule {
        name: "empty_stale",
        applies: |f| f.message_count == 0,
        state: ConversationState::Inactive,
    },
    Rule {
        name: "user_just_sent",
        applies: |f| f.last_is(&Role::User) && f.message_younger_than(mins(3)),
        state: ConversationState::Working,
    },
    Rule {
        name: "user_awaiting_response",
        applies: |f| f.last_is(&Role::User) && f.message_younger_than(mins(10)),
        state: ConversationState::AwaitingResponse,
    },
    Rule {
        name: "user_typing",
        applies: |f| f.last_is(&Role::User) && f.message_younger_than(mins(30)),
        state: ConversationState::Typing,
    },
    Rule {
        name: "user_stale",
        applies: |f| f.last_is(&Role::User),
        state: ConversationState::RecentlyActive,
    },
    Rule {
        name: "assistant_replied",
        applies: |f| f.last_is(&Role::Assistant) && f.message_younger_than(mins(10)),
        state: ConversationState::AwaitingInput,
    },
    Rule {
        name: "assistant_typing",
        applies: |f| f.last_is(&Role::Assistant) && f.message_younger_than(mins(30)),
        state: ConversationState::Typing,
    },
    Rule {
        name: "assistant_stale",
        applies: |f| f.last_is(&Role::Assistant),
        state: ConversationState::RecentlyActive,
    },
    Rule {
        name: "fallback_recent",
        applies: |f| f.file_age < mins(10) || f.message_younger_than(mins(30)),
        state: ConversationState::RecentlyActive,
    },
    Rule {
        name: "fallback_idle",
        applies: |f| f.file_age < mins(60) || f.message_younger_than(mins(120)),
        state: ConversationState::Idle,
    },
    Rule {
        name: "fallback_inactive",
        applies: |_| true,
        state: ConversationState::Inactive,
    },
];

fn age(now: DateTime<Utc>, then: DateTime<Utc>) -> Duration {
    // Timestamps in the future (clock skew) count as "just now".
    (now - then).to_std().unwrap_or(Duration::ZERO)
}

/// Compute the state of a conversation at `now`.
pub fn determine_state(
    messages: &[Message],
    last_modified: DateTime<Utc>,
    hint: ActivityHint,
    now: DateTime<Utc>,
) -> ConversationState {
    // Latest timestamp wins; with no timestamps at all this is the last
    // message in file order.
    let last = messages.iter().max_by_key(|m| m.timestamp);

    let facts = Facts {
        file_age: age(now, last_modified),
        message_count: messages.len(),
        last_role: last.map(|m| &m.role),
        last_message_age: last.and_then(|m| m.timestamp).map(|ts| age(now, ts)),
    };

    let state = RULES
        .iter()
        .find(|rule| (rule.applies)(&facts))
        .map(|rule| rule.state)
        .unwrap_or(ConversationState::Inactive);

    if hint.process_running && state == ConversationState::Inactive {
        ConversationState::Idle
    } else {
        state
    }
}

pub fn activity_level(
    messages: &[Message],
    last_modified: DateTime<Utc>,
    hint: ActivityHint,
    now: DateTime<Utc>,
) -> ActivityLevel {
    ActivityLevel::from_state(determine_state(messages, last_modified, hint, now))
}
