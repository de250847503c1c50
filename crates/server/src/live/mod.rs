//! Real-time conversation updates: file watching, change detection and
//! fan-out to WebSocket viewers.

pub mod events;
pub mod hub;
pub mod orchestrator;
pub mod watcher;

pub use events::{ClientMessage, PushMessage};
pub use hub::{BroadcastHub, BroadcastReport, Subscription, DEFAULT_SUBSCRIBER_BUFFER};
pub use orchestrator::Orchestrator;
pub use watcher::{ConversationWatcher, Debouncer, WatchError, WatchHandler, DEFAULT_DEBOUNCE_WINDOW};
