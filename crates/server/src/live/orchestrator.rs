//! Live conversation orchestrator.
//!
//! Owns everything that changes at runtime: the parse cache, the current
//! conversation list, per-conversation baselines and the broadcast hub.
//! Watcher callbacks land here; REST handlers read from here.
//!
//! Per conversation there is at most one change pass running and one
//! queued. A pass holds the conversation's slot lock from parse to the
//! baseline update, so two passes never interleave and the baseline only
//! moves after the broadcast for it was attempted.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use convo_live_core::{
    conversation_path_parts, determine_state, extract_project_info, get_parsed_conversation,
    list_conversations, ActivityHint, Baseline, CacheStats, Conversation, ConversationState,
    DiscoveryError, Message, ParseError, SnapshotCache,
};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::{DataRefreshData, PushMessage, StateChangeData};
use super::hub::BroadcastHub;
use super::watcher::{ConversationWatcher, WatchHandler};

/// Delay between attempts to start the watcher after a failure.
const WATCH_RETRY_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct SlotState {
    baseline: Baseline,
    last_state: Option<ConversationState>,
}

#[derive(Debug, Default)]
struct ConversationSlot {
    state: Mutex<SlotState>,
    /// A pass is waiting for the lock; further signals are absorbed by it.
    queued: AtomicBool,
}

pub struct Orchestrator {
    root: PathBuf,
    cache: SnapshotCache<Vec<Message>>,
    conversations: ArcSwap<Vec<Conversation>>,
    slots: DashMap<String, Arc<ConversationSlot>>,
    hub: BroadcastHub<Arc<PushMessage>>,
    reload_lock: Mutex<()>,
    realtime: AtomicBool,
    watch_failure_reported: AtomicBool,
}

impl Orchestrator {
    /// Must be called inside a tokio runtime (the hub spawns its task).
    pub fn new(root: impl Into<PathBuf>, subscriber_buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            root: root.into(),
            cache: SnapshotCache::new(),
            conversations: ArcSwap::from_pointee(Vec::new()),
            slots: DashMap::new(),
            hub: BroadcastHub::new(subscriber_buffer),
            reload_lock: Mutex::new(()),
            realtime: AtomicBool::new(false),
            watch_failure_reported: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn hub(&self) -> &BroadcastHub<Arc<PushMessage>> {
        &self.hub
    }

    /// Current conversation list, newest first.
    pub fn conversations(&self) -> Arc<Vec<Conversation>> {
        self.conversations.load_full()
    }

    pub fn conversation(&self, id: &str) -> Option<Conversation> {
        self.conversations.load().iter().find(|c| c.id == id).cloned()
    }

    /// Whether a watcher is currently delivering real-time updates.
    pub fn is_realtime(&self) -> bool {
        self.realtime.load(Ordering::Relaxed)
    }

    pub async fn parsed_conversation(&self, path: &Path) -> Result<Arc<Vec<Message>>, ParseError> {
        get_parsed_conversation(&self.cache, path).await
    }

    /// State of `conversation` right now, using the file's current mtime.
    pub async fn conversation_state(
        &self,
        conversation: &Conversation,
    ) -> Result<ConversationState, ParseError> {
        let messages = self.parsed_conversation(&conversation.file_path).await?;
        let modified = file_modified(&conversation.file_path)
            .await
            .unwrap_or(conversation.modified_at);
        Ok(determine_state(&messages, modified, ActivityHint::default(), Utc::now()))
    }

    /// Drop every cached parse. Returns how many entries were removed.
    pub fn reset_cache(&self) -> usize {
        let cleared = self.cache.len();
        self.cache.clear();
        info!(cleared, "Snapshot cache cleared");
        cleared
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Scan, parse and record a baseline for every conversation. No events
    /// are broadcast.
    pub async fn load_initial(&self) -> Result<usize, DiscoveryError> {
        let _guard = self.reload_lock.lock().await;
        let conversations = self.scan().await?;
        let now = Utc::now();

        for conversation in conversations.iter() {
            let messages = match self.parsed_conversation(&conversation.file_path).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(conversation_id = %conversation.id, error = %e, "Initial parse failed");
                    continue;
                }
            };
            let slot = self.slot(&conversation.id);
            let mut state = slot.state.lock().await;
            state.baseline = Baseline::from_messages(&messages);
            state.last_state = Some(determine_state(
                &messages,
                conversation.modified_at,
                ActivityHint::default(),
                now,
            ));
        }

        let count = conversations.len();
        self.conversations.store(conversations);
        info!(conversations = count, root = %self.root.display(), "Initial conversation scan complete");
        Ok(count)
    }

    /// Global refresh: rebuild the list, warm the cache and tell viewers.
    /// Baselines are left alone.
    pub async fn reload(&self) -> Result<usize, DiscoveryError> {
        let _guard = self.reload_lock.lock().await;
        let scan_started = Utc::now();
        let scanned = self.scan().await?;
        // Change passes may have updated the list while the scan ran.
        self.conversations
            .rcu(|current| merge_listing(&scanned, current, scan_started));
        let count = self.conversations.load().len();

        let report = self
            .hub
            .broadcast(Arc::new(PushMessage::DataRefresh(DataRefreshData {
                conversation_count: count,
                timestamp: Utc::now(),
            })))
            .await;
        debug!(conversations = count, delivered = report.delivered, "Conversation list reloaded");
        Ok(count)
    }

    /// List conversations and fill message counts through the cache.
    async fn scan(&self) -> Result<Arc<Vec<Conversation>>, DiscoveryError> {
        let mut conversations = list_conversations(&self.root).await?;
        for conversation in conversations.iter_mut() {
            match self.parsed_conversation(&conversation.file_path).await {
                Ok(messages) => conversation.message_count = messages.len(),
                Err(e) => {
                    debug!(conversation_id = %conversation.id, error = %e, "Skipping message count");
                }
            }
        }
        Ok(Arc::new(conversations))
    }

    fn slot(&self, id: &str) -> Arc<ConversationSlot> {
        self.slots.entry(id.to_string()).or_default().clone()
    }

    /// Schedule a change pass for one conversation. Returns immediately;
    /// signals arriving while a pass is already queued are absorbed.
    pub fn conversation_changed(self: &Arc<Self>, conversation_id: String, path: PathBuf) {
        let slot = self.slot(&conversation_id);
        if slot.queued.swap(true, Ordering::AcqRel) {
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            this.run_pass(&conversation_id, &path, &slot).await;
        });
    }

    /// Run one change pass to completion.
    pub async fn refresh_conversation(&self, conversation_id: &str, path: &Path) {
        let slot = self.slot(conversation_id);
        slot.queued.store(true, Ordering::Release);
        self.run_pass(conversation_id, path, &slot).await;
    }

    async fn run_pass(&self, conversation_id: &str, path: &Path, slot: &ConversationSlot) {
        let mut state = slot.state.lock().await;
        slot.queued.store(false, Ordering::Release);

        let messages = match self.parsed_conversation(path).await {
            Ok(m) => m,
            Err(e) => {
                warn!(conversation_id = %conversation_id, error = %e, "Failed to parse conversation");
                return;
            }
        };

        let changes = state.baseline.diff(&messages).merge();
        let total = messages.len();
        let now = Utc::now();

        if !changes.is_empty() {
            debug!(
                conversation_id = %conversation_id,
                new = changes.new.len(),
                updated = changes.updated.len(),
                "Broadcasting message changes"
            );
        }

        let frames = changes
            .new
            .iter()
            .map(|item| (item, false))
            .chain(changes.updated.iter().map(|item| (item, true)));
        for (item, is_updated) in frames {
            let frame = PushMessage::new_message(conversation_id, item, total, is_updated, now);
            self.hub.broadcast(Arc::new(frame)).await;
        }
        state.baseline = Baseline::from_messages(&messages);

        let metadata = tokio::fs::metadata(path).await.ok();
        let modified = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or(now);
        let computed = determine_state(&messages, modified, ActivityHint::default(), now);
        if state.last_state != Some(computed) {
            let frame = PushMessage::ConversationStateChange(StateChangeData {
                conversation_id: conversation_id.to_string(),
                state: computed,
                previous_state: state.last_state,
                timestamp: now,
            });
            self.hub.broadcast(Arc::new(frame)).await;
            state.last_state = Some(computed);
        }

        self.update_listing(conversation_id, path, total, modified, metadata.map(|m| m.len()));
    }

    /// Keep the list entry in step with the latest pass, adding an entry for
    /// conversations that appeared since the last scan.
    fn update_listing(
        &self,
        conversation_id: &str,
        path: &Path,
        message_count: usize,
        modified: DateTime<Utc>,
        size_bytes: Option<u64>,
    ) {
        let root = self.root.clone();
        self.conversations.rcu(|current| {
            let mut next: Vec<Conversation> = current.as_ref().clone();
            match next.iter_mut().find(|c| c.id == conversation_id) {
                Some(existing) => {
                    existing.message_count = message_count;
                    existing.modified_at = modified;
                    if let Some(size) = size_bytes {
                        existing.size_bytes = size;
                    }
                }
                None => {
                    let Some((project, _)) = conversation_path_parts(&root, path) else {
                        return next;
                    };
                    let info = extract_project_info(&project);
                    next.push(Conversation {
                        id: conversation_id.to_string(),
                        file_path: path.to_path_buf(),
                        project,
                        project_display_name: info.display_name,
                        project_path: info.path,
                        created_at: modified,
                        modified_at: modified,
                        size_bytes: size_bytes.unwrap_or(0),
                        message_count,
                    });
                }
            }
            next.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
            next
        });
    }

    /// Start the file watcher. A failure is reported once; later failures
    /// stay quiet and the server keeps serving without real-time updates.
    pub fn start_watching(self: &Arc<Self>, window: Duration) -> Option<ConversationWatcher> {
        let handler: Arc<dyn WatchHandler> = self.clone();
        match ConversationWatcher::start(&self.root, window, handler) {
            Ok(watcher) => {
                self.realtime.store(true, Ordering::Relaxed);
                Some(watcher)
            }
            Err(e) => {
                self.realtime.store(false, Ordering::Relaxed);
                if !self.watch_failure_reported.swap(true, Ordering::Relaxed) {
                    warn!(error = %e, "Real-time updates unavailable; serving without file watching");
                }
                None
            }
        }
    }

    /// Keep a watcher running until `shutdown` fires, retrying setup
    /// periodically if it fails.
    pub async fn watch_until(self: Arc<Self>, window: Duration, shutdown: CancellationToken) {
        let watcher = loop {
            if let Some(watcher) = self.start_watching(window) {
                break watcher;
            }
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(WATCH_RETRY_INTERVAL) => {}
            }
        };

        shutdown.cancelled().await;
        watcher.stop().await;
        self.realtime.store(false, Ordering::Relaxed);
    }
}

impl WatchHandler for Orchestrator {
    fn on_global_refresh(self: Arc<Self>) {
        tokio::spawn(async move {
            if let Err(e) = self.reload().await {
                warn!(error = %e, "Conversation reload failed");
            }
        });
    }

    fn on_conversation_changed(self: Arc<Self>, conversation_id: String, path: PathBuf) {
        self.conversation_changed(conversation_id, path);
    }
}

/// Combine a finished scan with the live list. An entry a change pass saw
/// at a later mtime wins over the scanned one, and entries first listed
/// after the scan started are kept even if the scan missed them.
fn merge_listing(
    scanned: &[Conversation],
    current: &[Conversation],
    scan_started: DateTime<Utc>,
) -> Vec<Conversation> {
    let live: HashMap<&str, &Conversation> = current.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut merged: Vec<Conversation> = scanned
        .iter()
        .map(|fresh| match live.get(fresh.id.as_str()) {
            Some(existing) if existing.modified_at > fresh.modified_at => (*existing).clone(),
            _ => fresh.clone(),
        })
        .collect();

    let scanned_ids: HashSet<&str> = scanned.iter().map(|c| c.id.as_str()).collect();
    merged.extend(
        current
            .iter()
            .filter(|c| c.modified_at >= scan_started && !scanned_ids.contains(c.id.as_str()))
            .cloned(),
    );

    merged.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    merged
}

async fn file_modified(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::hub::Subscription;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::time::SystemTime;
    use tempfile::TempDir;

    const USER: &str = r#"{"type":"user","uuid":"u1","timestamp":"2026-01-27T12:00:00Z","message":{"role":"user","content":"List files"}}"#;
    const TOOL_USE: &str = r#"{"type":"assistant","uuid":"a1","timestamp":"2026-01-27T12:00:05Z","message":{"id":"msg_1","role":"assistant","content":[{"type":"tool_use","id":"toolu_1","name":"Bash","input":{"command":"ls"}}]}}"#;
    const TOOL_RESULT: &str = r#"{"type":"user","uuid":"u2","timestamp":"2026-01-27T12:00:07Z","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"toolu_1","content":"a.txt"}]}}"#;
    const REPLY: &str = r#"{"type":"assistant","uuid":"a2","timestamp":"2026-01-27T12:00:09Z","message":{"id":"msg_2","role":"assistant","content":"One file."}}"#;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        path: PathBuf,
    }

    impl Fixture {
        fn new(lines: &[&str]) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().to_path_buf();
            let project = root.join("-work-app");
            std::fs::create_dir(&project).unwrap();
            let path = project.join("conv-1.jsonl");
            std::fs::write(&path, lines.iter().map(|l| format!("{l}\n")).collect::<String>()).unwrap();
            Self {
                _dir: dir,
                root,
                path,
            }
        }

        /// Append a line and move the mtime forward so the cache sees it.
        fn append(&self, line: &str) {
            let mut file = std::fs::OpenOptions::new().append(true).open(&self.path).unwrap();
            writeln!(file, "{line}").unwrap();
            let bumped = std::fs::metadata(&self.path).unwrap().modified().unwrap()
                + Duration::from_secs(1);
            file.set_modified(bumped.max(SystemTime::now())).unwrap();
        }
    }

    fn drain(sub: &mut Subscription<Arc<PushMessage>>) -> Vec<Arc<PushMessage>> {
        let mut frames = Vec::new();
        while let Ok(frame) = sub.receiver.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn message_frames(frames: &[Arc<PushMessage>]) -> Vec<(String, usize, bool)> {
        frames
            .iter()
            .filter_map(|f| match f.as_ref() {
                PushMessage::NewMessage(data) => Some((
                    data.message.id.clone(),
                    data.metadata.message_index,
                    data.metadata.is_updated,
                )),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_load_initial_lists_and_seeds() {
        let fx = Fixture::new(&[USER, TOOL_USE]);
        let orch = Orchestrator::new(&fx.root, 64);
        let mut sub = orch.hub().subscribe();

        assert_eq!(orch.load_initial().await.unwrap(), 1);
        let conv = orch.conversation("conv-1").unwrap();
        assert_eq!(conv.message_count, 2);
        assert_eq!(conv.project_display_name, "app");

        // Seeded baseline: an unchanged file yields no message frames.
        orch.refresh_conversation("conv-1", &fx.path).await;
        assert!(message_frames(&drain(&mut sub)).is_empty());
    }

    #[tokio::test]
    async fn test_appended_message_broadcast_as_new() {
        let fx = Fixture::new(&[USER]);
        let orch = Orchestrator::new(&fx.root, 64);
        orch.load_initial().await.unwrap();
        let mut sub = orch.hub().subscribe();

        fx.append(REPLY);
        orch.refresh_conversation("conv-1", &fx.path).await;

        let frames = drain(&mut sub);
        assert_eq!(message_frames(&frames), vec![("a2".to_string(), 1, false)]);
        let PushMessage::NewMessage(data) = frames[0].as_ref() else {
            panic!("expected new_message first");
        };
        assert_eq!(data.conversation_id, "conv-1");
        assert_eq!(data.metadata.total_messages, 2);

        // Baseline moved: a second pass reports nothing.
        orch.refresh_conversation("conv-1", &fx.path).await;
        assert!(message_frames(&drain(&mut sub)).is_empty());
        assert_eq!(orch.conversation("conv-1").unwrap().message_count, 2);
    }

    #[tokio::test]
    async fn test_late_tool_result_broadcast_as_update() {
        let fx = Fixture::new(&[USER, TOOL_USE]);
        let orch = Orchestrator::new(&fx.root, 64);
        orch.load_initial().await.unwrap();
        let mut sub = orch.hub().subscribe();

        fx.append(TOOL_RESULT);
        orch.refresh_conversation("conv-1", &fx.path).await;

        let frames = message_frames(&drain(&mut sub));
        assert_eq!(
            frames,
            vec![("u2".to_string(), 2, false), ("a1".to_string(), 1, true)]
        );
    }

    #[tokio::test]
    async fn test_unseeded_conversation_reports_everything_new() {
        let fx = Fixture::new(&[]);
        let orch = Orchestrator::new(&fx.root, 64);
        orch.load_initial().await.unwrap();
        let mut sub = orch.hub().subscribe();

        let fresh = fx.root.join("-work-app").join("conv-2.jsonl");
        std::fs::write(&fresh, format!("{USER}\n{REPLY}\n")).unwrap();
        orch.refresh_conversation("conv-2", &fresh).await;

        let frames = drain(&mut sub);
        assert_eq!(message_frames(&frames).len(), 2);
        assert!(frames.iter().any(|f| matches!(
            f.as_ref(),
            PushMessage::ConversationStateChange(d) if d.previous_state.is_none()
        )));
        // The new conversation is listed without waiting for a reload.
        assert!(orch.conversation("conv-2").is_some());
    }

    #[tokio::test]
    async fn test_concurrent_passes_do_not_double_report() {
        let fx = Fixture::new(&[USER]);
        let orch = Orchestrator::new(&fx.root, 64);
        orch.load_initial().await.unwrap();
        let mut sub = orch.hub().subscribe();

        fx.append(REPLY);
        tokio::join!(
            orch.refresh_conversation("conv-1", &fx.path),
            orch.refresh_conversation("conv-1", &fx.path),
        );

        assert_eq!(message_frames(&drain(&mut sub)).len(), 1);
    }

    #[tokio::test]
    async fn test_signal_burst_coalesces() {
        let fx = Fixture::new(&[USER]);
        let orch = Orchestrator::new(&fx.root, 64);
        orch.load_initial().await.unwrap();
        let mut sub = orch.hub().subscribe();

        fx.append(REPLY);
        for _ in 0..20 {
            orch.conversation_changed("conv-1".to_string(), fx.path.clone());
        }

        let mut received = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while received.is_empty() && tokio::time::Instant::now() < deadline {
            received.extend(message_frames(&drain(&mut sub)));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        received.extend(message_frames(&drain(&mut sub)));

        assert_eq!(received, vec![("a2".to_string(), 1, false)]);
    }

    #[tokio::test]
    async fn test_reload_broadcasts_refresh_and_keeps_baselines() {
        let fx = Fixture::new(&[USER]);
        let orch = Orchestrator::new(&fx.root, 64);
        orch.load_initial().await.unwrap();
        let mut sub = orch.hub().subscribe();

        fx.append(REPLY);
        assert_eq!(orch.reload().await.unwrap(), 1);

        let frames = drain(&mut sub);
        assert!(matches!(
            frames.as_slice(),
            [f] if matches!(f.as_ref(), PushMessage::DataRefresh(d) if d.conversation_count == 1)
        ));

        // The reload did not swallow the appended message.
        orch.refresh_conversation("conv-1", &fx.path).await;
        assert_eq!(
            message_frames(&drain(&mut sub)),
            vec![("a2".to_string(), 1, false)]
        );
    }

    fn listed(id: &str, modified: DateTime<Utc>, message_count: usize) -> Conversation {
        Conversation {
            id: id.to_string(),
            file_path: PathBuf::from(format!("/root/-work-app/{id}.jsonl")),
            project: "-work-app".to_string(),
            project_display_name: "app".to_string(),
            project_path: "/work/app".to_string(),
            created_at: modified,
            modified_at: modified,
            size_bytes: 0,
            message_count,
        }
    }

    #[test]
    fn test_merge_listing_never_goes_backwards() {
        let t0 = Utc::now() - chrono::Duration::minutes(5);
        let scan_started = t0 + chrono::Duration::minutes(1);
        let t_pass = t0 + chrono::Duration::minutes(2);

        // The scan read conv-1 at t0; a pass then saw it grow and also
        // listed conv-2, which appeared after the scan had walked the root.
        let scanned = vec![listed("conv-1", t0, 2), listed("gone-later", t0, 1)];
        let current = vec![
            listed("conv-1", t_pass, 5),
            listed("conv-2", t_pass, 1),
            listed("stale", t0, 3),
        ];

        let merged = merge_listing(&scanned, &current, scan_started);
        let summary: Vec<(&str, usize)> = merged
            .iter()
            .map(|c| (c.id.as_str(), c.message_count))
            .collect();

        assert_eq!(summary, vec![("conv-1", 5), ("conv-2", 1), ("gone-later", 1)]);
    }

    #[test]
    fn test_merge_listing_prefers_newer_scan() {
        let t0 = Utc::now() - chrono::Duration::minutes(5);
        let t1 = t0 + chrono::Duration::minutes(3);

        let merged = merge_listing(&[listed("conv-1", t1, 7)], &[listed("conv-1", t0, 2)], t0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].message_count, 7);
    }

    #[tokio::test]
    async fn test_reload_drops_vanished_conversations() {
        let fx = Fixture::new(&[USER]);
        let orch = Orchestrator::new(&fx.root, 64);
        orch.load_initial().await.unwrap();

        std::fs::remove_file(&fx.path).unwrap();
        assert_eq!(orch.reload().await.unwrap(), 0);
        assert!(orch.conversation("conv-1").is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_not_error() {
        let fx = Fixture::new(&[USER]);
        let orch = Orchestrator::new(&fx.root, 64);
        let ghost = fx.root.join("-work-app").join("ghost.jsonl");
        assert!(orch.parsed_conversation(&ghost).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_cache() {
        let fx = Fixture::new(&[USER]);
        let orch = Orchestrator::new(&fx.root, 64);
        orch.load_initial().await.unwrap();

        assert_eq!(orch.cache_stats().entries, 1);
        assert_eq!(orch.reset_cache(), 1);
        assert_eq!(orch.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_start_watching_reports_missing_root() {
        let dir = TempDir::new().unwrap();
        let orch = Orchestrator::new(dir.path().join("absent"), 8);

        assert!(orch.start_watching(Duration::from_millis(50)).is_none());
        assert!(orch.start_watching(Duration::from_millis(50)).is_none());
        assert!(!orch.is_realtime());
        assert!(orch.watch_failure_reported.load(Ordering::Relaxed));
    }
}
