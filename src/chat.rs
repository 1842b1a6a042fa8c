//! Section chat view: initial message load, live updates, typing signals.
//!
//! Composes the realtime manager and the store the way a chat screen needs
//! them: load the recent history (bounded by the initial-load timeout),
//! subscribe to the section's scope, then hydrate each bare insert
//! notification into a full row and deliver it exactly once. Hydration
//! failures drop the event and leave the channel live.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::CampusLinkClient;
use crate::error::{CampusLinkError, Result};
use crate::models::{
    ChangeEvent, ChannelEvent, ChannelStatus, Message, RecordId, Scope, UserProfile,
};
use crate::realtime::Channel;
use crate::seen::SeenIds;
use crate::session::Session;
use crate::store::{OrderDirection, StoreClient};
use crate::timeouts::CampusLinkTimeouts;

/// Projection expanding the sender onto each message row.
const MESSAGE_WITH_AUTHOR: &str = "*, users!user_id(name, avatar_url)";

/// How many recent messages the initial load fetches.
const HISTORY_LIMIT: u64 = 100;

/// Broadcast event name for typing indicators.
const TYPING_EVENT: &str = "typing";

/// Something happened in the open section.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// A new message, hydrated with its author. Delivered exactly once per
    /// message id, whether it arrived via the send path or the channel.
    Message(Message),

    /// A message was deleted.
    MessageDeleted(RecordId),

    /// Another user is typing in this section.
    Typing {
        user_id: RecordId,
        user_name: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct TypingPayload {
    user_id: RecordId,
    user_name: String,
}

#[derive(Serialize)]
struct NewMessage<'a> {
    user_id: &'a RecordId,
    community_id: &'a RecordId,
    section_id: &'a RecordId,
    content: &'a str,
}

/// A live view over one section's chat.
pub struct SectionChat {
    store: StoreClient,
    channel: Channel,
    community_id: RecordId,
    section_id: RecordId,
    user: UserProfile,
    seen: SeenIds,
    history: Vec<Message>,
    timeouts: CampusLinkTimeouts,
}

impl SectionChat {
    /// Open the chat for the session's selected community and section.
    ///
    /// Loads the most recent messages (oldest first), opens the section's
    /// channel, and seeds duplicate suppression with the loaded ids. The
    /// load is bounded by the configured initial-load timeout; an expired
    /// load fails this call without leaving a channel behind.
    pub async fn open(client: &CampusLinkClient, session: &Session) -> Result<Self> {
        let (community_id, section_id) = match (session.community_id(), session.section_id()) {
            (Some(community), Some(section)) => (community.clone(), section.clone()),
            _ => {
                return Err(CampusLinkError::ConfigurationError(
                    "opening a chat requires a selected community and section".into(),
                ));
            },
        };
        let scope = Scope::ChatSection {
            community_id: community_id.clone(),
            section_id: section_id.clone(),
        };

        let store = client.store().clone();
        let timeouts = client.timeouts().clone();

        let load = store
            .from("messages")
            .select(MESSAGE_WITH_AUTHOR)
            .eq("community_id", &community_id)
            .eq("section_id", &section_id)
            .order("created_at", OrderDirection::Ascending)
            .range(0, HISTORY_LIMIT - 1)
            .fetch::<Message>();
        let history = tokio::time::timeout(timeouts.initial_load_timeout, load)
            .await
            .map_err(|_| {
                CampusLinkError::TimeoutError(format!(
                    "Loading messages took longer than {:?}",
                    timeouts.initial_load_timeout
                ))
            })??;

        let channel = client.realtime().open(scope)?;

        let mut seen = SeenIds::new();
        seen.extend(history.iter().map(|m| m.id.clone()));

        Ok(Self {
            store,
            channel,
            community_id,
            section_id,
            user: session.user().clone(),
            seen,
            history,
            timeouts,
        })
    }

    /// The initial history snapshot, oldest first.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Current transport status of the underlying channel.
    pub fn status(&self) -> ChannelStatus {
        self.channel.status()
    }

    /// Receive the next chat event. Returns `None` once the view is closed.
    pub async fn next_event(&mut self) -> Option<Result<ChatEvent>> {
        loop {
            let item = self.channel.next().await?;
            let event = match item {
                Ok(event) => event,
                Err(e) => return Some(Err(e)),
            };

            match event {
                ChannelEvent::Change(ChangeEvent::Inserted { collection, id, .. })
                    if collection == "messages" =>
                {
                    // Claim before hydrating: the send path may have
                    // materialized this id already, and nothing async may
                    // run between the decision and the mark.
                    if !self.seen.claim(&id) {
                        debug!("[chat] duplicate delivery of {} suppressed", id);
                        continue;
                    }
                    match self.hydrate(&id).await {
                        Ok(Some(message)) => {
                            if self.channel.is_closed() {
                                return None;
                            }
                            return Some(Ok(ChatEvent::Message(message)));
                        },
                        Ok(None) => {
                            // The row vanished before the read; a delete
                            // raced the insert. Drop the event.
                            warn!("[chat] message {} gone before hydration", id);
                            continue;
                        },
                        Err(e) => {
                            warn!("[chat] hydration of {} failed: {}", id, e);
                            continue;
                        },
                    }
                },
                ChannelEvent::Change(ChangeEvent::Deleted { collection, id, .. })
                    if collection == "messages" =>
                {
                    self.seen.forget(&id);
                    return Some(Ok(ChatEvent::MessageDeleted(id)));
                },
                ChannelEvent::Change(_) => continue,
                ChannelEvent::Broadcast { event, payload } if event == TYPING_EVENT => {
                    let typing = match serde_json::from_value::<TypingPayload>(payload) {
                        Ok(typing) => typing,
                        Err(e) => {
                            debug!("[chat] malformed typing payload: {}", e);
                            continue;
                        },
                    };
                    if typing.user_id == self.user.id {
                        continue;
                    }
                    return Some(Ok(ChatEvent::Typing {
                        user_id: typing.user_id,
                        user_name: typing.user_name,
                    }));
                },
                ChannelEvent::Broadcast { .. } => continue,
            }
        }
    }

    /// Point-read a message with its author embed.
    async fn hydrate(&self, id: &RecordId) -> Result<Option<Message>> {
        self.store
            .from("messages")
            .select(MESSAGE_WITH_AUTHOR)
            .eq("id", id)
            .maybe_one::<Message>()
            .await
    }

    /// Send a message and materialize the echoed row immediately.
    ///
    /// The returned message is claimed in the duplicate-suppression set, so
    /// the later change notification for the same insert is dropped.
    pub async fn send_message(&mut self, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CampusLinkError::ConfigurationError(
                "cannot send an empty message".into(),
            ));
        }

        let row = NewMessage {
            user_id: &self.user.id,
            community_id: &self.community_id,
            section_id: &self.section_id,
            content,
        };
        let message: Message = self
            .store
            .insert("messages", &row, Some(MESSAGE_WITH_AUTHOR))
            .await?;
        self.seen.claim(&message.id);
        Ok(message)
    }

    /// Delete one of the user's own messages. The store rejects deletes of
    /// other users' rows; the matching change notification handles removal
    /// in every open view.
    pub async fn delete_message(&self, message_id: &RecordId) -> Result<()> {
        self.store
            .delete("messages")
            .eq("id", message_id)
            .eq("user_id", &self.user.id)
            .execute()
            .await
    }

    /// Tell other members of the section that the user is typing.
    /// Fire-and-forget; dropped silently when the transport is down.
    pub fn notify_typing(&self) {
        self.channel.publish(
            TYPING_EVENT,
            json!({
                "user_id": self.user.id,
                "user_name": self.user.name,
            }),
        );
    }

    /// The initial-load timeout in effect for this view.
    pub fn initial_load_timeout(&self) -> std::time::Duration {
        self.timeouts.initial_load_timeout
    }

    /// Close the view and its channel. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }

    /// Returns `true` once the view's channel is closed.
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_payload_round_trip() {
        let payload = json!({ "user_id": "u2", "user_name": "Grace" });
        let typing: TypingPayload = serde_json::from_value(payload).unwrap();
        assert_eq!(typing.user_id.as_str(), "u2");
        assert_eq!(typing.user_name, "Grace");
    }

    #[test]
    fn test_new_message_wire_shape() {
        let user_id = RecordId::from("u1");
        let community_id = RecordId::from("c1");
        let section_id = RecordId::from("s1");
        let row = NewMessage {
            user_id: &user_id,
            community_id: &community_id,
            section_id: &section_id,
            content: "hello",
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["community_id"], "c1");
        assert_eq!(value["section_id"], "s1");
        assert_eq!(value["content"], "hello");
    }
}
