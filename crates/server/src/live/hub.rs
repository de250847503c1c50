//! Fan-out of push events to connected viewers.
//!
//! A single dispatcher task owns the subscriber set; handles talk to it
//! over a command channel. Each subscriber has its own bounded queue, so a
//! slow viewer only loses its own events and a departed one is dropped on
//! the next broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Per-subscriber queue depth used when none is configured.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 256;

pub type SubscriberId = u64;

/// Receiving end handed to a new subscriber.
pub struct Subscription<T> {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<T>,
}

/// Outcome of one broadcast across all current subscribers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Subscribers whose queue was full; the event was skipped for them.
    pub dropped: usize,
    /// Subscribers found closed and removed.
    pub removed: usize,
}

enum Command<T> {
    Subscribe {
        id: SubscriberId,
        sender: mpsc::Sender<T>,
    },
    Unsubscribe(SubscriberId),
    Broadcast {
        event: T,
        reply: oneshot::Sender<BroadcastReport>,
    },
    Count(oneshot::Sender<usize>),
}

struct Subscriber<T> {
    sender: mpsc::Sender<T>,
    dropped: u64,
}

/// Cloneable handle to the dispatcher task.
pub struct BroadcastHub<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
}

impl<T> Clone for BroadcastHub<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            next_id: self.next_id.clone(),
            buffer: self.buffer,
        }
    }
}

impl<T: Clone + Send + 'static> BroadcastHub<T> {
    /// Spawn the dispatcher. Must be called inside a tokio runtime.
    pub fn new(buffer: usize) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(rx));
        Self {
            commands,
            next_id: Arc::new(AtomicU64::new(1)),
            buffer: buffer.max(1),
        }
    }

    /// Register a new subscriber. Broadcasts issued after this call are
    /// delivered to it.
    pub fn subscribe(&self) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.buffer);
        // Dispatcher gone means the runtime is shutting down; the receiver
        // then simply yields nothing.
        let _ = self.commands.send(Command::Subscribe { id, sender });
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        let _ = self.commands.send(Command::Unsubscribe(id));
    }

    /// Offer `event` to every current subscriber. Resolves once every
    /// delivery was attempted; never fails.
    pub async fn broadcast(&self, event: T) -> BroadcastReport {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Broadcast { event, reply }).is_err() {
            return BroadcastReport::default();
        }
        rx.await.unwrap_or_default()
    }

    pub async fn subscriber_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(Command::Count(reply)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

async fn dispatch<T: Clone>(mut commands: mpsc::UnboundedReceiver<Command<T>>) {
    let mut subscribers: HashMap<SubscriberId, Subscriber<T>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Subscribe { id, sender } => {
                subscribers.insert(id, Subscriber { sender, dropped: 0 });
                debug!(subscriber_id = id, total = subscribers.len(), "Subscriber added");
            }
            Command::Unsubscribe(id) => {
                if subscribers.remove(&id).is_some() {
                    debug!(subscriber_id = id, total = subscribers.len(), "Subscriber removed");
                }
            }
            Command::Broadcast { event, reply } => {
                let report = deliver(&mut subscribers, event);
                let _ = reply.send(report);
            }
            Command::Count(reply) => {
                let _ = reply.send(subscribers.len());
            }
        }
    }
}

fn deliver<T: Clone>(subscribers: &mut HashMap<SubscriberId, Subscriber<T>>, event: T) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    subscribers.retain(|id, subscriber| match subscriber.sender.try_send(event.clone()) {
        Ok(()) => {
            report.delivered += 1;
            true
        }
        Err(TrySendError::Full(_)) => {
            report.dropped += 1;
            subscriber.dropped += 1;
            if subscriber.dropped == 1 || subscriber.dropped % 100 == 0 {
                warn!(
                    subscriber_id = *id,
                    dropped_total = subscriber.dropped,
                    "Subscriber queue full, event dropped"
                );
            }
            true
        }
        Err(TrySendError::Closed(_)) => {
            report.removed += 1;
            debug!(subscriber_id = *id, "Subscriber closed, removing");
            false
        }
    });

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let hub = BroadcastHub::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_ne!(a.id, b.id);

        let report = hub.broadcast("hello").await;
        assert_eq!(report.delivered, 2);
        assert_eq!(a.receiver.recv().await, Some("hello"));
        assert_eq!(b.receiver.recv().await, Some("hello"));
    }

    #[tokio::test]
    async fn test_broadcast_without_subscribers() {
        let hub: BroadcastHub<u32> = BroadcastHub::new(8);
        assert_eq!(hub.broadcast(1).await, BroadcastReport::default());
        assert_eq!(hub.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_closed_subscriber_removed() {
        let hub = BroadcastHub::new(8);
        let gone = hub.subscribe();
        let mut live = hub.subscribe();
        drop(gone.receiver);

        let report = hub.broadcast(7u32).await;
        assert_eq!(report.removed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(hub.subscriber_count().await, 1);
        assert_eq!(live.receiver.recv().await, Some(7));
    }

    #[tokio::test]
    async fn test_full_queue_only_affects_slow_subscriber() {
        let hub = BroadcastHub::new(2);
        let mut slow = hub.subscribe();
        let mut fast = hub.subscribe();

        let mut reports = Vec::new();
        for i in 0..3u32 {
            reports.push(hub.broadcast(i).await);
            assert_eq!(fast.receiver.recv().await, Some(i));
        }

        assert_eq!(reports[2].delivered, 1);
        assert_eq!(reports[2].dropped, 1);
        // The slow subscriber is kept and still has the first two events.
        assert_eq!(hub.subscriber_count().await, 2);
        assert_eq!(slow.receiver.recv().await, Some(0));
        assert_eq!(slow.receiver.recv().await, Some(1));
        assert!(slow.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_receiver() {
        let hub = BroadcastHub::new(4);
        let mut sub = hub.subscribe();
        hub.unsubscribe(sub.id);

        assert_eq!(hub.broadcast(1u8).await.delivered, 0);
        assert_eq!(sub.receiver.recv().await, None);
    }
}
