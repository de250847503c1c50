// crates/core/src/cache.rs
//! Modification-time keyed memo of expensive per-file work.
//!
//! An entry is valid only while the stored mtime equals the file's current
//! mtime. A mismatch is an ordinary miss, never an error. There is no
//! eviction: the cache grows with the number of conversations and is only
//! emptied by [`SnapshotCache::clear`].

use dashmap::DashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::trace;

struct CacheEntry<V> {
    modified: SystemTime,
    value: Arc<V>,
}

/// Hit/miss counters plus current entry count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

pub struct SnapshotCache<V> {
    entries: DashMap<PathBuf, CacheEntry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for SnapshotCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> SnapshotCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up `file_id`; returns the value only if it was stored for
    /// exactly `current_modified`.
    pub fn get(&self, file_id: &Path, current_modified: SystemTime) -> Option<Arc<V>> {
        let hit = self
            .entries
            .get(file_id)
            .filter(|entry| entry.modified == current_modified)
            .map(|entry| entry.value.clone());

        match hit {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(path = %file_id.display(), "snapshot cache miss");
                None
            }
        }
    }

    /// Store `value` for `file_id` at `modified`, replacing any older entry.
    pub fn put(&self, file_id: impl Into<PathBuf>, modified: SystemTime, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.insert(
            file_id.into(),
            CacheEntry {
                modified,
                value: value.clone(),
            },
        );
        value
    }

    pub fn invalidate(&self, file_id: &Path) {
        self.entries.remove(file_id);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
