// crates/core/src/lib.rs
pub mod cache;
pub mod diff;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod state;
pub mod types;

pub use cache::{CacheStats, SnapshotCache};
pub use diff::{Baseline, ChangeSet, Fingerprint, IndexedMessage};
pub use discovery::*;
pub use error::*;
pub use parser::*;
pub use state::{activity_level, determine_state, ActivityHint, ActivityLevel, ConversationState};
pub use types::*;
