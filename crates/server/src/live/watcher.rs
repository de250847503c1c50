//! File system watcher for conversation JSONL files.
//!
//! Watches the projects root recursively and turns raw notify events into
//! two kinds of callbacks:
//!
//! - `on_conversation_changed(id, path)` immediately, for every create or
//!   modify of a conversation file (`{project}/{id}.jsonl`, exactly two
//!   components below the root);
//! - `on_global_refresh()` once activity has been quiet for the debounce
//!   window.
//!
//! ```text
//! root/
//! ├── {project}/
//! │   ├── {id}.jsonl              ← conversation (per-file + refresh)
//! │   └── {id}/subagents/*.jsonl  ← deeper files (refresh only)
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use convo_live_core::conversation_path_parts;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Quiet period before a global refresh fires.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(2000);

/// Capacity of the channel between the notify callback and the loop.
const RAW_EVENT_BUFFER: usize = 1024;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Watch root does not exist: {path}")]
    RootMissing { path: PathBuf },

    #[error("Failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Receives watcher callbacks. Implementations must not block; long work
/// belongs on a spawned task.
pub trait WatchHandler: Send + Sync + 'static {
    fn on_global_refresh(self: Arc<Self>);
    fn on_conversation_changed(self: Arc<Self>, conversation_id: String, path: PathBuf);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Armed { deadline: Instant },
    Fired,
}

/// Trailing-edge debounce: every event pushes the deadline out by the full
/// window; the deadline passing with no new event fires once.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    state: DebounceState,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: DebounceState::Idle,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn arm(&mut self, now: Instant) {
        self.state = DebounceState::Armed {
            deadline: now + self.window,
        };
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Armed { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Returns `true` exactly once per armed period, when `now` has reached
    /// the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            DebounceState::Armed { deadline } if now >= deadline => {
                self.state = DebounceState::Fired;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.state = DebounceState::Idle;
    }
}

/// A running watch. Dropping it cancels the loop; [`stop`](Self::stop)
/// additionally waits for the loop to exit.
pub struct ConversationWatcher {
    _watcher: RecommendedWatcher,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    dropped_events: Arc<AtomicU64>,
}

impl ConversationWatcher {
    pub fn start(
        root: &Path,
        window: Duration,
        handler: Arc<dyn WatchHandler>,
    ) -> Result<Self, WatchError> {
        if !root.is_dir() {
            return Err(WatchError::RootMissing {
                path: root.to_path_buf(),
            });
        }

        let (tx, rx) = mpsc::channel::<Event>(RAW_EVENT_BUFFER);
        let dropped_events = Arc::new(AtomicU64::new(0));
        let dropped_counter = dropped_events.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Reads of our own (parsing) show up as access events.
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                if let Err(TrySendError::Full(_)) = tx.try_send(event) {
                    let count = dropped_counter.fetch_add(1, Ordering::Relaxed) + 1;
                    if count == 1 || count % 100 == 0 {
                        warn!(
                            dropped_total = count,
                            "File watcher channel full, event dropped"
                        );
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "File watcher error");
            }
        })
        .map_err(|source| WatchError::Notify {
            path: root.to_path_buf(),
            source,
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Notify {
                path: root.to_path_buf(),
                source,
            })?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            rx,
            root.to_path_buf(),
            window,
            handler,
            cancel.clone(),
        ));

        info!(
            root = %root.display(),
            debounce_ms = window.as_millis() as u64,
            "Watching conversation files"
        );

        Ok(Self {
            _watcher: watcher,
            cancel,
            task: Some(task),
            dropped_events,
        })
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Stop watching. Once this returns no handler callback will run and no
    /// debounce timer is pending.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Watcher loop ended abnormally");
            }
        }
        debug!("File watcher stopped");
    }
}

impl Drop for ConversationWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Event loop: forwards per-file changes immediately and drives the
/// debouncer for global refreshes.
pub(crate) async fn run_loop(
    mut events: mpsc::Receiver<Event>,
    root: PathBuf,
    window: Duration,
    handler: Arc<dyn WatchHandler>,
    cancel: CancellationToken,
) {
    let mut debouncer = Debouncer::new(window);

    loop {
        let deadline = debouncer.deadline();

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debouncer.cancel();
                break;
            }

            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    debouncer.cancel();
                    break;
                };
                if matches!(event.kind, EventKind::Access(_)) {
                    continue;
                }
                debouncer.arm(Instant::now());

                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    continue;
                }
                for path in event.paths {
                    if let Some((_, conversation_id)) = conversation_path_parts(&root, &path) {
                        handler.clone().on_conversation_changed(conversation_id, path);
                    }
                }
            }

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if debouncer.poll(Instant::now()) {
                    debug!("Debounce window elapsed, triggering global refresh");
                    handler.clone().on_global_refresh();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        refreshes: AtomicU64,
        changed: Mutex<Vec<(String, PathBuf)>>,
    }

    impl WatchHandler for Recorder {
        fn on_global_refresh(self: Arc<Self>) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversation_changed(self: Arc<Self>, conversation_id: String, path: PathBuf) {
            self.changed.lock().unwrap().push((conversation_id, path));
        }
    }

    impl Recorder {
        fn refreshes(&self) -> u64 {
            self.refreshes.load(Ordering::SeqCst)
        }

        fn changed_ids(&self) -> Vec<String> {
            self.changed.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
        }
    }

    fn modify(path: impl Into<PathBuf>) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content))).add_path(path.into())
    }

    struct Harness {
        tx: mpsc::Sender<Event>,
        recorder: Arc<Recorder>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    }

    fn spawn_loop(window: Duration) -> Harness {
        let (tx, rx) = mpsc::channel(RAW_EVENT_BUFFER);
        let recorder = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            rx,
            PathBuf::from("/root/projects"),
            window,
            recorder.clone(),
            cancel.clone(),
        ));
        Harness {
            tx,
            recorder,
            cancel,
            task,
        }
    }

    #[test]
    fn test_debouncer_state_machine() {
        let start = Instant::now();
        let mut d = Debouncer::new(Duration::from_secs(2));
        assert_eq!(d.state(), DebounceState::Idle);
        assert!(!d.poll(start + Duration::from_secs(10)));

        d.arm(start);
        assert!(!d.poll(start + Duration::from_secs(1)));

        // Re-arming pushes the deadline out.
        d.arm(start + Duration::from_secs(1));
        assert!(!d.poll(start + Duration::from_secs(2)));
        assert!(d.poll(start + Duration::from_secs(3)));
        assert_eq!(d.state(), DebounceState::Fired);
        assert!(!d.poll(start + Duration::from_secs(4)));

        d.arm(start + Duration::from_secs(5));
        d.cancel();
        assert_eq!(d.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_produces_single_refresh() {
        let h = spawn_loop(Duration::from_millis(2000));

        for i in 0..50 {
            h.tx
                .send(modify(format!("/root/projects/-app/conv-{}.jsonl", i % 3)))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(h.recorder.refreshes(), 0);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(h.recorder.refreshes(), 1);

        // Per-file signals are not debounced.
        assert_eq!(h.recorder.changed_ids().len(), 50);

        h.cancel.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_refresh_separately() {
        let h = spawn_loop(Duration::from_millis(200));

        h.tx.send(modify("/root/projects/-app/a.jsonl")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        h.tx.send(modify("/root/projects/-app/a.jsonl")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(h.recorder.refreshes(), 2);
        h.cancel.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_leaves_no_pending_refresh() {
        let h = spawn_loop(Duration::from_millis(2000));

        h.tx.send(modify("/root/projects/-app/a.jsonl")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        h.cancel.cancel();
        h.task.await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.recorder.refreshes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_file_filtering() {
        let h = spawn_loop(Duration::from_millis(2000));

        let events = [
            Event::new(EventKind::Create(CreateKind::File)).add_path("/root/projects/-app/new.jsonl".into()),
            modify("/root/projects/-app/conv/subagents/agent-1.jsonl"),
            modify("/root/projects/-app/notes.txt"),
            modify("/root/projects/top.jsonl"),
            Event::new(EventKind::Remove(RemoveKind::File)).add_path("/root/projects/-app/old.jsonl".into()),
        ];
        for event in events {
            h.tx.send(event).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(h.recorder.changed_ids(), vec!["new".to_string()]);

        // Everything above still counts as activity for the global refresh.
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(h.recorder.refreshes(), 1);

        h.cancel.cancel();
        h.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_start_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let recorder: Arc<dyn WatchHandler> = Arc::new(Recorder::default());
        let result = ConversationWatcher::start(&dir.path().join("absent"), DEFAULT_DEBOUNCE_WINDOW, recorder);
        assert!(matches!(result, Err(WatchError::RootMissing { .. })));
    }

    #[tokio::test]
    async fn test_real_file_change_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let project = root.join("-work-app");
        std::fs::create_dir(&project).unwrap();

        let recorder = Arc::new(Recorder::default());
        let watcher =
            ConversationWatcher::start(&root, Duration::from_millis(100), recorder.clone()).unwrap();

        std::fs::write(project.join("live.jsonl"), "{\"role\":\"user\",\"content\":\"hi\"}\n").unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while recorder.changed_ids().is_empty() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(recorder.changed_ids().iter().all(|id| id == "live"));
        assert!(!recorder.changed_ids().is_empty());

        watcher.stop().await;
        let refreshes = recorder.refreshes();
        std::fs::write(project.join("live.jsonl"), "more\n").unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(recorder.refreshes(), refreshes);
    }
}
