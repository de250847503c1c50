// crates/server/src/config.rs
//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use convo_live_core::{claude_projects_dir, DiscoveryError};

use crate::live::DEFAULT_SUBSCRIBER_BUFFER;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47893;

#[derive(Debug, Clone, Parser)]
#[command(name = "convo-live")]
#[command(about = "Live viewer backend for assistant conversation logs", long_about = None)]
pub struct Config {
    /// Port to listen on (always bound to 127.0.0.1)
    #[arg(long, env = "CONVO_LIVE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Projects root to watch [default: ~/.claude/projects]
    #[arg(long, env = "CONVO_LIVE_ROOT")]
    pub root: Option<PathBuf>,

    /// Quiet period before a global refresh, in milliseconds
    #[arg(long, env = "CONVO_LIVE_DEBOUNCE_MS", default_value_t = 2000)]
    pub debounce_ms: u64,

    /// Queue depth per WebSocket viewer
    #[arg(long, env = "CONVO_LIVE_SUBSCRIBER_BUFFER", default_value_t = DEFAULT_SUBSCRIBER_BUFFER)]
    pub subscriber_buffer: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "CONVO_LIVE_LOG", default_value = "info")]
    pub log_level: String,

    /// Serve from the initial scan only, without real-time updates
    #[arg(long)]
    pub no_watch: bool,
}

impl Config {
    pub fn projects_root(&self) -> Result<PathBuf, DiscoveryError> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => claude_projects_dir(),
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
