//! `RealtimeManager` - channel registry and entry point for subscriptions.
//!
//! Owns the invariant that at most one live channel exists per scope key:
//! opening a scope whose topic is already registered first signals the old
//! channel's task to shut down, then registers a new generation. Stale
//! handles carry their generation, so a late close or Drop cannot remove a
//! successor's registry entry.

use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};

use crate::auth::AuthProvider;
use crate::error::{CampusLinkError, Result};
use crate::event_handlers::EventHandlers;
use crate::models::{ChannelStatus, ConnectionOptions, Scope};
use crate::timeouts::CampusLinkTimeouts;

use super::channel::Channel;
use super::connection::{channel_task, ChannelTaskContext};
use super::{resolve_ws_url, DEFAULT_EVENT_CHANNEL_CAPACITY, PUBLISH_CHANNEL_CAPACITY};

/// A live channel's registry entry.
pub(crate) struct ActiveChannel {
    pub(crate) generation: u64,
    pub(crate) close_tx: mpsc::Sender<()>,
}

pub(crate) type Registry = Arc<Mutex<HashMap<String, ActiveChannel>>>;

/// Opens and tracks realtime channels for one client.
pub struct RealtimeManager {
    base_url: String,
    auth: AuthProvider,
    timeouts: CampusLinkTimeouts,
    options: ConnectionOptions,
    handlers: EventHandlers,
    registry: Registry,
    next_generation: AtomicU64,
}

impl RealtimeManager {
    pub(crate) fn new(
        base_url: String,
        auth: AuthProvider,
        timeouts: CampusLinkTimeouts,
        options: ConnectionOptions,
        handlers: EventHandlers,
    ) -> Self {
        Self {
            base_url,
            auth,
            timeouts,
            options,
            handlers,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Open a channel for a scope, replacing any live channel with the
    /// same scope key.
    ///
    /// Returns immediately: establishment runs in a background task and
    /// its failures surface as [`ChannelStatus::Error`] on the returned
    /// handle's status watch (and through the connection-level error
    /// callback), never as an `Err` here. The only errors `open` itself
    /// reports are configuration problems such as an invalid base URL.
    pub fn open(&self, scope: Scope) -> Result<Channel> {
        let request_url = resolve_ws_url(&self.base_url)?;
        let topic = scope.topic();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let (event_tx, event_rx) = mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(ChannelStatus::Connecting);
        let (close_tx, close_rx) = mpsc::channel(1);
        let (publish_tx, publish_rx) = mpsc::channel(PUBLISH_CHANNEL_CAPACITY);

        {
            let mut registry = self
                .registry
                .lock()
                .map_err(|_| CampusLinkError::InternalError("channel registry poisoned".into()))?;
            if let Some(previous) = registry.remove(&topic) {
                debug!(
                    "[{}] replacing live channel (generation {})",
                    topic, previous.generation
                );
                let _ = previous.close_tx.try_send(());
            }
            registry.insert(
                topic.clone(),
                ActiveChannel {
                    generation,
                    close_tx: close_tx.clone(),
                },
            );
        }

        let ctx = ChannelTaskContext {
            request_url,
            topic: topic.clone(),
            scope: scope.clone(),
            auth: self.auth.clone(),
            timeouts: self.timeouts.clone(),
            options: self.options.clone(),
            handlers: self.handlers.clone(),
        };
        tokio::spawn(channel_task(ctx, event_tx, status_tx, close_rx, publish_rx));

        Ok(Channel::new(
            scope,
            topic,
            generation,
            event_rx,
            status_rx,
            close_tx,
            publish_tx,
            self.registry.clone(),
        ))
    }

    /// Whether a channel is currently registered for this scope.
    pub fn is_live(&self, scope: &Scope) -> bool {
        self.registry
            .lock()
            .map(|registry| registry.contains_key(&scope.topic()))
            .unwrap_or(false)
    }

    /// Topics of all currently registered channels.
    pub fn live_topics(&self) -> Vec<String> {
        self.registry
            .lock()
            .map(|registry| registry.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Signal every registered channel to shut down (logout path).
    pub fn close_all(&self) {
        if let Ok(mut registry) = self.registry.lock() {
            for (topic, entry) in registry.drain() {
                debug!("[{}] closing on shutdown", topic);
                let _ = entry.close_tx.try_send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;
    use std::time::Duration;

    /// A manager pointed at a port that refuses connections, so channel
    /// tasks fail fast and never reach a live server.
    fn test_manager() -> RealtimeManager {
        RealtimeManager::new(
            "http://127.0.0.1:9".to_string(),
            AuthProvider::none(),
            CampusLinkTimeouts::fast(),
            ConnectionOptions::default(),
            EventHandlers::new(),
        )
    }

    fn chat_scope(section: &str) -> Scope {
        Scope::ChatSection {
            community_id: RecordId::from("c1"),
            section_id: RecordId::from(section),
        }
    }

    #[tokio::test]
    async fn test_open_registers_single_channel_per_scope() {
        let manager = test_manager();
        let scope = chat_scope("s1");

        let first = manager.open(scope.clone()).unwrap();
        let second = manager.open(scope.clone()).unwrap();

        assert_eq!(manager.live_topics().len(), 1, "one entry per scope key");
        assert!(manager.is_live(&scope));
        assert!(second.generation() > first.generation());
        drop((first, second));
    }

    #[tokio::test]
    async fn test_replaced_channel_terminates() {
        let manager = test_manager();
        let scope = chat_scope("s1");

        let mut first = manager.open(scope.clone()).unwrap();
        let _second = manager.open(scope.clone()).unwrap();

        // The replaced channel's task was signalled; its event stream must
        // end rather than hang.
        let end = tokio::time::timeout(Duration::from_secs(2), first.next())
            .await
            .expect("replaced channel must terminate promptly");
        assert!(end.is_none());
        assert!(first.is_closed());
    }

    #[tokio::test]
    async fn test_stale_drop_leaves_successor_registered() {
        let manager = test_manager();
        let scope = chat_scope("s1");

        let first = manager.open(scope.clone()).unwrap();
        let second = manager.open(scope.clone()).unwrap();

        // Dropping the replaced handle must not evict its successor.
        drop(first);
        assert!(manager.is_live(&scope));

        drop(second);
        assert!(!manager.is_live(&scope), "current handle's drop deregisters");
    }

    #[tokio::test]
    async fn test_close_deregisters_channel() {
        let manager = test_manager();
        let scope = chat_scope("s2");

        let mut channel = manager.open(scope.clone()).unwrap();
        assert!(manager.is_live(&scope));
        channel.close().await.unwrap();
        assert!(!manager.is_live(&scope));
    }

    #[tokio::test]
    async fn test_distinct_scopes_coexist() {
        let manager = test_manager();
        let a = manager.open(chat_scope("s1")).unwrap();
        let b = manager.open(chat_scope("s2")).unwrap();
        assert_eq!(manager.live_topics().len(), 2);
        drop((a, b));
    }

    #[tokio::test]
    async fn test_close_all_empties_registry() {
        let manager = test_manager();
        let mut a = manager.open(chat_scope("s1")).unwrap();
        let _b = manager.open(chat_scope("s2")).unwrap();

        manager.close_all();
        assert!(manager.live_topics().is_empty());

        // Signalled channels terminate.
        let end = tokio::time::timeout(Duration::from_secs(2), a.next())
            .await
            .expect("closed channel must terminate promptly");
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_base_url() {
        let manager = RealtimeManager::new(
            "not a url".to_string(),
            AuthProvider::none(),
            CampusLinkTimeouts::fast(),
            ConnectionOptions::default(),
            EventHandlers::new(),
        );
        assert!(manager.open(chat_scope("s1")).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_transport_reports_error_status() {
        let manager = test_manager();
        let mut channel = manager.open(chat_scope("s1")).unwrap();

        // The task cannot connect; the failure must surface as an error
        // status on the watch, not as a panic or a hang.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        loop {
            match tokio::time::timeout_at(deadline, channel.status_changed()).await {
                Ok(Some(ChannelStatus::Error(_))) => break,
                Ok(Some(_)) => continue,
                Ok(None) => panic!("status watch ended before reporting an error"),
                Err(_) => panic!("no error status within deadline"),
            }
        }
        channel.close().await.unwrap();
    }
}
