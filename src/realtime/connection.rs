//! Per-channel background task owning the WebSocket transport.
//!
//! The task establishes the connection, registers the subscription, routes
//! inbound frames through the scope filter to the consumer, and recovers
//! from transport loss with exponential backoff. Exactly one task exists
//! per channel, so the per-channel reconnect state (attempt counter,
//! pending retry sleep) has a single owner and a close signal cancels the
//! pending retry via `select!`.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use serde_json::Value as JsonValue;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::error::Error as WsError;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

use crate::auth::AuthProvider;
use crate::error::{CampusLinkError, Result};
use crate::event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
use crate::models::{
    ChangeEvent, ChangeKind, ChannelEvent, ChannelStatus, ClientMessage, ConnectionOptions, Scope,
    ServerMessage,
};
use crate::timeouts::CampusLinkTimeouts;

use super::{
    build_ws_request, jitter_keepalive_interval, reconnect_delay, WebSocketStream, FAR_FUTURE,
    MAX_WS_TEXT_MESSAGE_BYTES,
};

/// Everything a channel task needs, captured at `open` time.
pub(crate) struct ChannelTaskContext {
    pub request_url: String,
    pub topic: String,
    pub scope: Scope,
    pub auth: AuthProvider,
    pub timeouts: CampusLinkTimeouts,
    pub options: ConnectionOptions,
    pub handlers: EventHandlers,
}

/// Where an inbound frame should go.
pub(crate) enum Routed {
    /// Deliver to the channel's consumer.
    Event(ChannelEvent),
    /// Server-reported error on this subscription.
    ServerError { code: String, message: String },
    /// Subscription acknowledged.
    Ack,
    /// Out of scope or foreign topic; dropped silently.
    Ignored,
}

/// Route a parsed server frame against the channel's topic and scope.
///
/// Change notifications are collection-wide on the wire; anything whose
/// scope fields do not match is dropped here, before dispatch, and never
/// queued.
pub(crate) fn route_frame(topic: &str, scope: &Scope, msg: ServerMessage) -> Routed {
    match msg {
        ServerMessage::SubscribeAck { topic: t } => {
            if t == topic {
                Routed::Ack
            } else {
                Routed::Ignored
            }
        },
        ServerMessage::Change {
            topic: t,
            collection,
            change_type,
            id,
            fields,
        } => {
            if t != topic {
                trace!("[{}] change for foreign topic '{}' dropped", topic, t);
                return Routed::Ignored;
            }
            if !scope.matches(&collection, &fields) {
                trace!("[{}] {} change out of scope dropped", topic, collection);
                return Routed::Ignored;
            }
            let change = match change_type {
                ChangeKind::Insert => ChangeEvent::Inserted {
                    collection,
                    id,
                    fields,
                },
                ChangeKind::Delete => ChangeEvent::Deleted {
                    collection,
                    id,
                    fields,
                },
            };
            Routed::Event(ChannelEvent::Change(change))
        },
        ServerMessage::Broadcast {
            topic: t,
            event,
            payload,
        } => {
            if t == topic {
                Routed::Event(ChannelEvent::Broadcast { event, payload })
            } else {
                Routed::Ignored
            }
        },
        ServerMessage::Error {
            topic: t,
            code,
            message,
        } => {
            if t.as_deref().map_or(true, |t| t == topic) {
                Routed::ServerError { code, message }
            } else {
                Routed::Ignored
            }
        },
    }
}

fn parse_message(text: &str) -> Result<ServerMessage> {
    serde_json::from_str::<ServerMessage>(text).map_err(|e| {
        CampusLinkError::SerializationError(format!("Failed to parse server frame: {}", e))
    })
}

async fn send_frame(
    ws: &mut WebSocketStream,
    frame: &ClientMessage,
    handlers: &EventHandlers,
) -> Result<()> {
    let payload = serde_json::to_string(frame).map_err(|e| {
        CampusLinkError::WebSocketError(format!("Failed to serialize frame: {}", e))
    })?;
    ws.send(WsMessage::Text(payload.clone().into()))
        .await
        .map_err(|e| CampusLinkError::WebSocketError(format!("Failed to send frame: {}", e)))?;
    handlers.emit_send(&payload);
    Ok(())
}

/// Best-effort Unsubscribe + Close on graceful shutdown.
async fn send_unsubscribe_and_close(
    ws: &mut WebSocketStream,
    topic: &str,
    handlers: &EventHandlers,
) {
    let frame = ClientMessage::Unsubscribe {
        topic: topic.to_string(),
    };
    let _ = send_frame(ws, &frame, handlers).await;
    let _ = ws.close(None).await;
}

/// Connect, authenticate via handshake headers, and register the
/// subscription. On success the stream is ready for the read loop.
async fn establish(ctx: &ChannelTaskContext) -> Result<WebSocketStream> {
    debug!("[{}] establishing transport at {}", ctx.topic, ctx.request_url);
    let request = build_ws_request(&ctx.request_url, &ctx.auth)?;

    let connect_result = if !CampusLinkTimeouts::is_no_timeout(ctx.timeouts.connection_timeout) {
        tokio::time::timeout(ctx.timeouts.connection_timeout, connect_async(request)).await
    } else {
        Ok(connect_async(request).await)
    };

    let mut ws = match connect_result {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(WsError::Http(response))) => {
            let message = match response.status().as_u16() {
                401 => "Unauthorized: realtime endpoint requires valid credentials".to_string(),
                403 => "Forbidden: access to the realtime endpoint denied".to_string(),
                code => format!("WebSocket HTTP error: {}", code),
            };
            return Err(CampusLinkError::WebSocketError(message));
        },
        Ok(Err(e)) => {
            return Err(CampusLinkError::WebSocketError(format!(
                "Connection failed: {}",
                e
            )));
        },
        Err(_) => {
            return Err(CampusLinkError::TimeoutError(format!(
                "Connection timeout ({:?})",
                ctx.timeouts.connection_timeout
            )));
        },
    };

    let subscribe = ClientMessage::Subscribe {
        topic: ctx.topic.clone(),
        filters: ctx.scope.filters(),
    };
    send_frame(&mut ws, &subscribe, &ctx.handlers).await?;

    Ok(ws)
}

/// Why the read loop returned.
enum ReadOutcome {
    /// Close was requested by the handle (or its Drop).
    Shutdown,
    /// The consumer handle is gone; nothing left to deliver to.
    ConsumerGone,
    /// The transport failed; the reason feeds the error status.
    Dropped(String),
}

async fn read_loop(
    ws: &mut WebSocketStream,
    ctx: &ChannelTaskContext,
    event_tx: &mpsc::Sender<Result<ChannelEvent>>,
    close_rx: &mut mpsc::Receiver<()>,
    publish_rx: &mut mpsc::Receiver<(String, JsonValue)>,
) -> ReadOutcome {
    let has_keepalive = !ctx.timeouts.keepalive_interval.is_zero();
    let keepalive_dur = if has_keepalive {
        jitter_keepalive_interval(ctx.timeouts.keepalive_interval, &ctx.topic)
    } else {
        FAR_FUTURE
    };
    let mut idle_deadline = TokioInstant::now() + keepalive_dur;

    loop {
        let idle_sleep = tokio::time::sleep_until(idle_deadline);
        tokio::pin!(idle_sleep);

        tokio::select! {
            biased;

            // Highest priority: shutdown requested by close() or Drop.
            _ = close_rx.recv() => return ReadOutcome::Shutdown,

            // Outbound fire-and-forget signals (typing indicators).
            Some((event, payload)) = publish_rx.recv() => {
                let frame = ClientMessage::Publish {
                    topic: ctx.topic.clone(),
                    event,
                    payload,
                };
                if let Err(e) = send_frame(ws, &frame, &ctx.handlers).await {
                    return ReadOutcome::Dropped(format!("Publish failed: {}", e));
                }
                idle_deadline = TokioInstant::now() + keepalive_dur;
            }

            // Keepalive idle timer.
            _ = &mut idle_sleep, if has_keepalive => {
                if let Err(e) = ws.send(WsMessage::Ping(Bytes::new())).await {
                    return ReadOutcome::Dropped(format!("Keepalive ping failed: {}", e));
                }
                ctx.handlers.emit_send("[ping]");
                idle_deadline = TokioInstant::now() + keepalive_dur;
            }

            // Normal path: the next WebSocket frame.
            frame = ws.next() => {
                idle_deadline = TokioInstant::now() + keepalive_dur;
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        if text.len() > MAX_WS_TEXT_MESSAGE_BYTES {
                            warn!(
                                "[{}] oversized frame dropped ({} bytes)",
                                ctx.topic,
                                text.len()
                            );
                            continue;
                        }
                        ctx.handlers.emit_receive(&text);
                        let msg = match parse_message(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("[{}] unparseable frame: {}", ctx.topic, e);
                                continue;
                            },
                        };
                        match route_frame(&ctx.topic, &ctx.scope, msg) {
                            Routed::Event(event) => {
                                if event_tx.send(Ok(event)).await.is_err() {
                                    return ReadOutcome::ConsumerGone;
                                }
                            },
                            Routed::ServerError { code, message } => {
                                ctx.handlers.emit_error(ConnectionError::new(
                                    format!("{}: {}", code, message),
                                    true,
                                ));
                                let err = CampusLinkError::WebSocketError(format!(
                                    "Server error {}: {}",
                                    code, message
                                ));
                                if event_tx.send(Err(err)).await.is_err() {
                                    return ReadOutcome::ConsumerGone;
                                }
                            },
                            Routed::Ack => {
                                debug!("[{}] subscription acknowledged", ctx.topic);
                            },
                            Routed::Ignored => {},
                        }
                    },
                    Some(Ok(WsMessage::Ping(payload))) => {
                        let _ = ws.send(WsMessage::Pong(payload)).await;
                    },
                    Some(Ok(WsMessage::Pong(_)))
                    | Some(Ok(WsMessage::Binary(_)))
                    | Some(Ok(WsMessage::Frame(_))) => {},
                    Some(Ok(WsMessage::Close(frame))) => {
                        let reason = frame
                            .map(|f| format!("Server closed connection: {}", f.reason))
                            .unwrap_or_else(|| "Server closed connection".to_string());
                        return ReadOutcome::Dropped(reason);
                    },
                    Some(Err(e)) => {
                        return ReadOutcome::Dropped(format!("WebSocket error: {}", e));
                    },
                    None => return ReadOutcome::Dropped("WebSocket stream ended".to_string()),
                }
            }
        }
    }
}

/// Drive one channel for its whole life: connect, read, back off, retry.
pub(crate) async fn channel_task(
    ctx: ChannelTaskContext,
    event_tx: mpsc::Sender<Result<ChannelEvent>>,
    status_tx: watch::Sender<ChannelStatus>,
    mut close_rx: mpsc::Receiver<()>,
    mut publish_rx: mpsc::Receiver<(String, JsonValue)>,
) {
    // Failures since the last successful connection; reset to zero on
    // every successful (re)connect.
    let mut attempts: u32 = 0;

    loop {
        let _ = status_tx.send(ChannelStatus::Connecting);

        let established = tokio::select! {
            biased;
            _ = close_rx.recv() => {
                let _ = status_tx.send(ChannelStatus::Closed);
                return;
            }
            result = establish(&ctx) => result,
        };

        match established {
            Ok(mut ws) => {
                attempts = 0;
                let _ = status_tx.send(ChannelStatus::Connected);
                ctx.handlers.emit_connect();
                info!("[{}] channel connected", ctx.topic);

                match read_loop(&mut ws, &ctx, &event_tx, &mut close_rx, &mut publish_rx).await {
                    ReadOutcome::Shutdown | ReadOutcome::ConsumerGone => {
                        send_unsubscribe_and_close(&mut ws, &ctx.topic, &ctx.handlers).await;
                        let _ = status_tx.send(ChannelStatus::Closed);
                        ctx.handlers.emit_disconnect(DisconnectReason::with_code(
                            "Channel closed by client",
                            1000,
                        ));
                        return;
                    },
                    ReadOutcome::Dropped(reason) => {
                        warn!("[{}] transport lost: {}", ctx.topic, reason);
                        let _ = status_tx.send(ChannelStatus::Error(reason.clone()));
                        ctx.handlers.emit_disconnect(DisconnectReason::new(reason));
                    },
                }
            },
            Err(e) => {
                let message = e.to_string();
                let _ = status_tx.send(ChannelStatus::Error(message.clone()));
                ctx.handlers.emit_error(ConnectionError::new(message, true));
            },
        }

        // Transport is down; decide whether to retry.
        if !ctx.options.auto_reconnect {
            let _ = event_tx.try_send(Err(CampusLinkError::WebSocketError(
                "Transport lost and auto-reconnect is disabled".to_string(),
            )));
            let _ = status_tx.send(ChannelStatus::Closed);
            return;
        }

        if let Some(max) = ctx.options.max_reconnect_attempts {
            if attempts >= max {
                warn!("[{}] max reconnection attempts ({}) reached", ctx.topic, max);
                ctx.handlers.emit_error(ConnectionError::new(
                    format!("Max reconnection attempts ({}) reached", max),
                    false,
                ));
                let _ = event_tx.try_send(Err(CampusLinkError::WebSocketError(
                    "Max reconnection attempts reached".to_string(),
                )));
                let _ = status_tx.send(ChannelStatus::Closed);
                return;
            }
        }

        let delay = reconnect_delay(attempts, &ctx.options);
        attempts += 1;
        info!(
            "[{}] reconnecting in {:?} (attempt {})",
            ctx.topic, delay, attempts
        );

        // The pending retry sleep is cancelled by a close signal; signals
        // published while the transport is down are discarded.
        let sleep_fut = tokio::time::sleep(delay);
        tokio::pin!(sleep_fut);
        loop {
            tokio::select! {
                biased;
                _ = close_rx.recv() => {
                    let _ = status_tx.send(ChannelStatus::Closed);
                    return;
                }
                Some(_) = publish_rx.recv() => {
                    trace!("[{}] publish dropped while disconnected", ctx.topic);
                }
                _ = &mut sleep_fut => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;
    use crate::seen::SeenIds;
    use serde_json::json;
    use std::collections::HashMap;

    fn chat_scope() -> Scope {
        Scope::ChatSection {
            community_id: RecordId::from("c1"),
            section_id: RecordId::from("s1"),
        }
    }

    fn insert_frame(topic: &str, section: &str, id: &str) -> ServerMessage {
        ServerMessage::Change {
            topic: topic.to_string(),
            collection: "messages".to_string(),
            change_type: ChangeKind::Insert,
            id: RecordId::from(id),
            fields: HashMap::from([
                ("community_id".to_string(), json!("c1")),
                ("section_id".to_string(), json!(section)),
            ]),
        }
    }

    #[test]
    fn test_out_of_scope_insert_is_ignored() {
        // Channel scoped to s1; m1 lands in s2 and must never dispatch.
        let scope = chat_scope();
        let topic = scope.topic();
        let routed = route_frame(&topic, &scope, insert_frame(&topic, "s2", "m1"));
        assert!(matches!(routed, Routed::Ignored));
    }

    #[test]
    fn test_in_scope_insert_dispatches_once_per_frame() {
        let scope = chat_scope();
        let topic = scope.topic();
        let routed = route_frame(&topic, &scope, insert_frame(&topic, "s1", "m2"));
        match routed {
            Routed::Event(ChannelEvent::Change(ChangeEvent::Inserted { id, .. })) => {
                assert_eq!(id.as_str(), "m2");
            },
            _ => panic!("expected an Inserted event"),
        }
    }

    #[test]
    fn test_redelivered_insert_materializes_once() {
        // The transport may redeliver; the consumer's SeenIds claim keeps
        // materialization exactly-once.
        let scope = chat_scope();
        let topic = scope.topic();
        let mut seen = SeenIds::new();
        let mut materialized = 0;

        for _ in 0..2 {
            if let Routed::Event(ChannelEvent::Change(ChangeEvent::Inserted { id, .. })) =
                route_frame(&topic, &scope, insert_frame(&topic, "s1", "m2"))
            {
                if seen.claim(&id) {
                    materialized += 1;
                }
            } else {
                panic!("expected an Inserted event");
            }
        }
        assert_eq!(materialized, 1);
    }

    #[test]
    fn test_foreign_topic_frames_are_ignored() {
        let scope = chat_scope();
        let topic = scope.topic();
        let routed = route_frame(&topic, &scope, insert_frame("comments-p1", "s1", "m3"));
        assert!(matches!(routed, Routed::Ignored));

        let broadcast = ServerMessage::Broadcast {
            topic: "comments-p1".to_string(),
            event: "typing".to_string(),
            payload: json!({}),
        };
        assert!(matches!(
            route_frame(&topic, &scope, broadcast),
            Routed::Ignored
        ));
    }

    #[test]
    fn test_own_topic_broadcast_dispatches() {
        let scope = chat_scope();
        let topic = scope.topic();
        let broadcast = ServerMessage::Broadcast {
            topic: topic.clone(),
            event: "typing".to_string(),
            payload: json!({ "user_id": "u2" }),
        };
        match route_frame(&topic, &scope, broadcast) {
            Routed::Event(ChannelEvent::Broadcast { event, .. }) => {
                assert_eq!(event, "typing");
            },
            _ => panic!("expected a Broadcast event"),
        }
    }

    #[test]
    fn test_server_error_routes_to_channel() {
        let scope = chat_scope();
        let topic = scope.topic();
        let err = ServerMessage::Error {
            topic: None,
            code: "rate_limited".to_string(),
            message: "slow down".to_string(),
        };
        assert!(matches!(
            route_frame(&topic, &scope, err),
            Routed::ServerError { .. }
        ));
    }

    #[test]
    fn test_delete_notification_dispatches_in_scope() {
        let scope = chat_scope();
        let topic = scope.topic();
        let frame = ServerMessage::Change {
            topic: topic.clone(),
            collection: "messages".to_string(),
            change_type: ChangeKind::Delete,
            id: RecordId::from("m9"),
            fields: HashMap::from([
                ("community_id".to_string(), json!("c1")),
                ("section_id".to_string(), json!("s1")),
            ]),
        };
        match route_frame(&topic, &scope, frame) {
            Routed::Event(ChannelEvent::Change(ChangeEvent::Deleted { id, .. })) => {
                assert_eq!(id.as_str(), "m9");
            },
            _ => panic!("expected a Deleted event"),
        }
    }
}
