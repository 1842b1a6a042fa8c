//! `Channel` - consumer handle for one live subscription.
//!
//! Events arrive through a bounded queue in transport order; status
//! transitions through a watch. Closing is idempotent, cancels the
//! background task (including any pending retry timer), and immediately
//! stops delivery: once `close()` has run, `next()` returns `None` even
//! for events already queued.

use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::models::{ChannelEvent, ChannelStatus, Scope};

use super::manager::Registry;

/// Consumer handle for a live realtime subscription.
///
/// # Examples
///
/// ```rust,no_run
/// use campus_link::{CampusLinkClient, Scope};
/// use campus_link::models::RecordId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = CampusLinkClient::builder()
///     .base_url("http://localhost:8000")
///     .build()?;
///
/// let mut channel = client.realtime().open(Scope::PostComments {
///     post_id: RecordId::from("p1"),
/// })?;
///
/// while let Some(event) = channel.next().await {
///     match event {
///         Ok(change) => println!("change: {:?}", change),
///         Err(e) => eprintln!("error: {}", e),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Channel {
    scope: Scope,
    topic: String,
    /// Generation tag assigned by the manager; guards registry cleanup so
    /// a stale handle cannot remove its successor.
    generation: u64,
    /// Receives events from the background task in transport order.
    event_rx: mpsc::Receiver<Result<ChannelEvent>>,
    /// Observes the transport state of this channel.
    status_rx: watch::Receiver<ChannelStatus>,
    /// Signals the background task to shut down.
    close_tx: mpsc::Sender<()>,
    /// Outbound fire-and-forget broadcast signals.
    publish_tx: mpsc::Sender<(String, JsonValue)>,
    registry: Registry,
    closed: bool,
}

impl Channel {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        scope: Scope,
        topic: String,
        generation: u64,
        event_rx: mpsc::Receiver<Result<ChannelEvent>>,
        status_rx: watch::Receiver<ChannelStatus>,
        close_tx: mpsc::Sender<()>,
        publish_tx: mpsc::Sender<(String, JsonValue)>,
        registry: Registry,
    ) -> Self {
        Self {
            scope,
            topic,
            generation,
            event_rx,
            status_rx,
            close_tx,
            publish_tx,
            registry,
            closed: false,
        }
    }

    /// The scope this channel is bound to.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The channel's topic (scope key).
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Receive the next event, in transport order.
    ///
    /// Returns `None` once the channel is closed (explicitly, by
    /// replacement, or because the retry budget was exhausted). A closed
    /// channel never yields again, even for events that were queued before
    /// the close.
    pub async fn next(&mut self) -> Option<Result<ChannelEvent>> {
        if self.closed {
            return None;
        }
        match self.event_rx.recv().await {
            Some(item) => Some(item),
            None => {
                // Background task exited; make the terminal state sticky.
                self.closed = true;
                self.deregister();
                None
            },
        }
    }

    /// Current transport status.
    pub fn status(&self) -> ChannelStatus {
        self.status_rx.borrow().clone()
    }

    /// Wait for the next status transition. Returns `None` once the
    /// background task is gone.
    pub async fn status_changed(&mut self) -> Option<ChannelStatus> {
        self.status_rx.changed().await.ok()?;
        Some(self.status_rx.borrow().clone())
    }

    /// Publish an ephemeral broadcast signal on this channel's topic.
    ///
    /// Fire-and-forget: unordered, not persisted, and silently dropped
    /// when the transport is down or the signal queue is full.
    pub fn publish(&self, event: impl Into<String>, payload: JsonValue) {
        let _ = self.publish_tx.try_send((event.into(), payload));
    }

    /// Close the channel.
    ///
    /// Idempotent; a second call is a no-op. Tears down the transport
    /// subscription, cancels any pending reconnect timer, and stops
    /// delivery immediately: no event reaches the consumer after this
    /// returns, including in-flight completions.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.deregister();
        let _ = self.close_tx.try_send(());
        Ok(())
    }

    /// Returns `true` if `close()` has been called or the channel ended.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Remove this channel's registry entry unless a successor already
    /// replaced it (generation mismatch).
    fn deregister(&self) {
        if let Ok(mut registry) = self.registry.lock() {
            let is_current = registry
                .get(&self.topic)
                .map_or(false, |entry| entry.generation == self.generation);
            if is_current {
                registry.remove(&self.topic);
            }
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        // Same cleanup as close(), fire-and-forget. A replaced handle's
        // generation no longer matches, so it cannot evict its successor.
        if !self.closed {
            self.deregister();
            let _ = self.close_tx.try_send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangeEvent, RecordId};
    use crate::realtime::manager::ActiveChannel;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct TestEnds {
        event_tx: mpsc::Sender<Result<ChannelEvent>>,
        status_tx: watch::Sender<ChannelStatus>,
        close_rx: mpsc::Receiver<()>,
        publish_rx: mpsc::Receiver<(String, serde_json::Value)>,
    }

    /// Build a channel with hand-held senders and no background task, for
    /// exercising handle state without a network connection.
    fn make_test_channel() -> (Channel, TestEnds) {
        let scope = Scope::ChatSection {
            community_id: RecordId::from("c1"),
            section_id: RecordId::from("s1"),
        };
        let topic = scope.topic();
        let (event_tx, event_rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connecting);
        let (close_tx, close_rx) = mpsc::channel(1);
        let (publish_tx, publish_rx) = mpsc::channel(8);
        let registry: Registry = Arc::new(Mutex::new(HashMap::new()));
        registry.lock().unwrap().insert(
            topic.clone(),
            ActiveChannel {
                generation: 1,
                close_tx: close_tx.clone(),
            },
        );

        let channel = Channel::new(
            scope,
            topic,
            1,
            event_rx,
            status_rx,
            close_tx,
            publish_tx,
            registry,
        );
        (
            channel,
            TestEnds {
                event_tx,
                status_tx,
                close_rx,
                publish_rx,
            },
        )
    }

    fn test_event(id: &str) -> ChannelEvent {
        ChannelEvent::Change(ChangeEvent::Inserted {
            collection: "messages".to_string(),
            id: RecordId::from(id),
            fields: HashMap::new(),
        })
    }

    #[tokio::test]
    async fn test_is_not_closed_initially() {
        let (channel, _ends) = make_test_channel();
        assert!(!channel.is_closed());
        assert_eq!(channel.status(), ChannelStatus::Connecting);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut channel, _ends) = make_test_channel();
        channel.close().await.expect("first close should succeed");
        channel.close().await.expect("second close is a no-op");
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_close_signals_background_task() {
        let (mut channel, mut ends) = make_test_channel();
        channel.close().await.unwrap();
        assert!(ends.close_rx.try_recv().is_ok(), "task must see the close");
    }

    #[tokio::test]
    async fn test_no_delivery_after_close_even_when_queued() {
        let (mut channel, ends) = make_test_channel();
        // An event is already queued when close() runs; it must never be
        // delivered.
        ends.event_tx.send(Ok(test_event("m1"))).await.unwrap();
        channel.close().await.unwrap();

        let result = tokio::time::timeout(Duration::from_millis(100), channel.next())
            .await
            .expect("next() must complete immediately after close");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_events_are_delivered_in_order() {
        let (mut channel, ends) = make_test_channel();
        ends.event_tx.send(Ok(test_event("m1"))).await.unwrap();
        ends.event_tx.send(Ok(test_event("m2"))).await.unwrap();

        for expected in ["m1", "m2"] {
            match channel.next().await {
                Some(Ok(ChannelEvent::Change(ChangeEvent::Inserted { id, .. }))) => {
                    assert_eq!(id.as_str(), expected);
                },
                other => panic!("unexpected item: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_next_ends_when_task_exits() {
        let (mut channel, ends) = make_test_channel();
        drop(ends.event_tx);
        let result = tokio::time::timeout(Duration::from_millis(100), channel.next())
            .await
            .expect("next() must complete when the sender is gone");
        assert!(result.is_none());
        assert!(channel.is_closed());
    }

    #[tokio::test]
    async fn test_status_transitions_are_observable() {
        let (mut channel, ends) = make_test_channel();
        ends.status_tx.send(ChannelStatus::Connected).unwrap();
        let status = channel.status_changed().await;
        assert_eq!(status, Some(ChannelStatus::Connected));
    }

    #[tokio::test]
    async fn test_publish_is_fire_and_forget() {
        let (channel, mut ends) = make_test_channel();
        channel.publish("typing", serde_json::json!({ "user_id": "u1" }));
        let (event, payload) = ends.publish_rx.try_recv().expect("signal must be queued");
        assert_eq!(event, "typing");
        assert_eq!(payload["user_id"], "u1");

        // A full or closed queue drops the signal without erroring.
        drop(ends.publish_rx);
        channel.publish("typing", serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_close_removes_registry_entry() {
        let (mut channel, _ends) = make_test_channel();
        let registry = channel.registry.clone();
        assert_eq!(registry.lock().unwrap().len(), 1);
        channel.close().await.unwrap();
        assert!(registry.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_handle_cannot_evict_successor() {
        let (mut channel, _ends) = make_test_channel();
        // Simulate replacement: the registry now holds generation 2.
        let registry = channel.registry.clone();
        {
            let mut map = registry.lock().unwrap();
            map.get_mut(channel.topic()).unwrap().generation = 2;
        }
        channel.close().await.unwrap();
        assert_eq!(
            registry.lock().unwrap().len(),
            1,
            "generation mismatch must leave the successor registered"
        );
    }

    /// Drop without close() must not panic, in or out of a runtime.
    #[test]
    fn test_drop_without_runtime_does_not_panic() {
        let channel = {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async { make_test_channel().0 })
        };
        drop(channel);
    }

    #[tokio::test]
    async fn test_drop_signals_cleanup() {
        let (channel, mut ends) = make_test_channel();
        let registry = channel.registry.clone();
        drop(channel);
        assert!(ends.close_rx.try_recv().is_ok());
        assert!(registry.lock().unwrap().is_empty());
    }
}
