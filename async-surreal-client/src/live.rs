// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! The live-query multiplexer: fans incoming notifications out to every
//! consumer stream registered for a subscription id.
//!
//! Sinks are bounded (capacity [`SINK_CAPACITY`]). When a consumer falls
//! behind and its buffer is full, the notification is dropped for that
//! sink and the `missed_notifications` counter increments; delivery never
//! applies backpressure to the transport.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use hashbrown::HashMap;
use log::{debug, warn};
use surreal_core::metrics::MetricsSink;
use surreal_core::sync::Mutex;
use surreal_core::{Action, Notification};
use tokio::sync::mpsc;

/// Buffered notifications per sink before overflow drops kick in.
pub const SINK_CAPACITY: usize = 100;

/// A single-consumer stream of notifications for one subscription.
///
/// The stream ends when the subscription is killed, when the server sends
/// a `close` notification (which is always the last item observed), or
/// when the connection drops (in which case the stream simply ends, with
/// no final `close`).
#[derive(Debug)]
pub struct LiveStream {
    rx: mpsc::Receiver<Notification>,
}

impl Stream for LiveStream {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Notification>> {
        self.rx.poll_recv(cx)
    }
}

struct Subscription {
    /// The table the subscription watches, when known. Used for cache
    /// invalidation; unknown for sinks attached to ids the client never
    /// saw a `live` call for.
    table: Option<String>,
    sinks: Vec<mpsc::Sender<Notification>>,
}

/// Per-subscription-id fan-out of incoming notifications.
pub(crate) struct LiveRouter {
    subscriptions: Mutex<HashMap<String, Subscription>>,
    missed: AtomicU64,
}

impl LiveRouter {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            missed: AtomicU64::new(0),
        }
    }

    /// Attach a new sink to `id`, creating the subscription entry if it
    /// does not exist yet. The table is recorded on first registration.
    pub fn register(&self, id: &str, table: Option<&str>) -> LiveStream {
        let (tx, rx) = mpsc::channel(SINK_CAPACITY);
        let mut subs = self.subscriptions.lock();
        let entry = subs.entry(id.to_string()).or_insert_with(|| Subscription {
            table: None,
            sinks: Vec::new(),
        });
        if entry.table.is_none() {
            entry.table = table.map(str::to_string);
        }
        entry.sinks.push(tx);
        LiveStream { rx }
    }

    /// The table a subscription watches, when the client knows it.
    pub fn table_of(&self, id: &str) -> Option<String> {
        self.subscriptions.lock().get(id).and_then(|s| s.table.clone())
    }

    /// Deliver a notification to every sink registered for its
    /// subscription id. A `close` action finishes all sinks and removes
    /// the entry. Returns the watched table so the caller can invalidate
    /// the cache.
    pub fn dispatch(&self, notification: Notification, metrics: &dyn MetricsSink) -> Option<String> {
        let mut subs = self.subscriptions.lock();
        let Some(entry) = subs.get_mut(&notification.subscription_id) else {
            debug!(
                "dropping notification for unknown subscription {}",
                notification.subscription_id
            );
            return None;
        };
        let table = entry.table.clone();
        entry.sinks.retain(|sink| {
            match sink.try_send(notification.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.missed.fetch_add(1, Ordering::Relaxed);
                    metrics.on_missed_notification(&notification.subscription_id);
                    warn!(
                        "subscription {} sink is full, dropping a notification",
                        notification.subscription_id
                    );
                    true
                }
                // Consumer dropped its stream; forget the sink.
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        if notification.action == Action::Close {
            subs.remove(&notification.subscription_id);
        }
        table
    }

    /// Finish and drop all sinks for one subscription id, without a
    /// final `close` item. Used by `kill`.
    pub fn close(&self, id: &str) {
        self.subscriptions.lock().remove(id);
    }

    /// Finish all sinks across all ids. Used on disconnect, where the
    /// server has forgotten the subscriptions.
    pub fn close_all(&self) {
        self.subscriptions.lock().clear();
    }

    /// Notifications dropped because a sink's buffer was full.
    pub fn missed_notifications(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use surreal_core::metrics::NoopMetrics;
    use surreal_types::Value;

    fn notification(id: &str, action: Action) -> Notification {
        Notification {
            subscription_id: id.to_string(),
            action,
            data: Value::Strand("payload".into()),
        }
    }

    #[tokio::test]
    async fn fan_out_reaches_every_sink_in_order() {
        let router = LiveRouter::new();
        let mut a = router.register("sub", Some("products"));
        let mut b = router.register("sub", None);

        router.dispatch(notification("sub", Action::Create), &NoopMetrics);
        router.dispatch(notification("sub", Action::Update), &NoopMetrics);

        for stream in [&mut a, &mut b] {
            assert_eq!(stream.next().await.unwrap().action, Action::Create);
            assert_eq!(stream.next().await.unwrap().action, Action::Update);
        }
        assert_eq!(router.table_of("sub").as_deref(), Some("products"));
    }

    #[tokio::test]
    async fn close_is_the_last_item() {
        let router = LiveRouter::new();
        let mut stream = router.register("sub", Some("t"));

        router.dispatch(notification("sub", Action::Create), &NoopMetrics);
        router.dispatch(notification("sub", Action::Close), &NoopMetrics);
        // After close the entry is gone; further dispatches go nowhere.
        router.dispatch(notification("sub", Action::Delete), &NoopMetrics);

        assert_eq!(stream.next().await.unwrap().action, Action::Create);
        assert_eq!(stream.next().await.unwrap().action, Action::Close);
        assert!(stream.next().await.is_none());
        assert!(router.table_of("sub").is_none());
    }

    #[tokio::test]
    async fn close_all_finishes_streams_without_close() {
        let router = LiveRouter::new();
        let mut stream = router.register("sub", Some("t"));
        router.close_all();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn overflow_drops_and_counts() {
        let router = LiveRouter::new();
        let mut stream = router.register("sub", Some("t"));
        for _ in 0..(SINK_CAPACITY + 5) {
            router.dispatch(notification("sub", Action::Update), &NoopMetrics);
        }
        assert_eq!(router.missed_notifications(), 5);
        // The sink still works for what it buffered.
        assert_eq!(stream.next().await.unwrap().action, Action::Update);
    }

    #[tokio::test]
    async fn dropped_consumers_are_forgotten() {
        let router = LiveRouter::new();
        let stream = router.register("sub", Some("t"));
        drop(stream);
        router.dispatch(notification("sub", Action::Update), &NoopMetrics);
        let subs = router.subscriptions.lock();
        assert!(subs.get("sub").unwrap().sinks.is_empty());
    }
}
