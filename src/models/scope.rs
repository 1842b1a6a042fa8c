use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

use super::change_event::ChangeKind;
use super::event_filter::EventFilter;
use super::record_id::RecordId;

/// The logical partition a subscription is bound to.
///
/// At most one live channel may exist per scope key (the [`topic`](Self::topic)
/// string) at any time; opening a second channel for the same key replaces
/// the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One community section's chat messages.
    ChatSection {
        community_id: RecordId,
        section_id: RecordId,
    },

    /// One post's comment thread.
    PostComments { post_id: RecordId },

    /// One community section's polls and their votes.
    CommunityPolls {
        community_id: RecordId,
        section_id: RecordId,
    },
}

impl Scope {
    /// The unique scope key, used as the transport topic.
    pub fn topic(&self) -> String {
        match self {
            Self::ChatSection {
                community_id,
                section_id,
            } => format!("community-chat-{}-{}", community_id, section_id),
            Self::PostComments { post_id } => format!("comments-{}", post_id),
            Self::CommunityPolls { section_id, .. } => format!("section-polls-{}", section_id),
        }
    }

    /// Collection/event filters this scope registers with the transport.
    pub fn filters(&self) -> Vec<EventFilter> {
        match self {
            Self::ChatSection { .. } => vec![EventFilter::new(
                "messages",
                vec![ChangeKind::Insert, ChangeKind::Delete],
            )],
            Self::PostComments { .. } => {
                vec![EventFilter::new("comments", vec![ChangeKind::Insert])]
            },
            Self::CommunityPolls { .. } => vec![
                EventFilter::new("polls", vec![ChangeKind::Insert, ChangeKind::Delete]),
                EventFilter::new("votes", vec![ChangeKind::Insert]),
            ],
        }
    }

    /// Check an inbound notification's scope fields against this scope.
    ///
    /// The service publishes collection-wide notifications, so a message
    /// posted to a different section still arrives on the wire; events that
    /// fail this check are dropped silently before dispatch, never queued.
    ///
    /// Vote notifications carry only a `poll_id`; they pass here and are
    /// refined by the polls view against its known poll ids.
    pub fn matches(&self, collection: &str, fields: &HashMap<String, JsonValue>) -> bool {
        let field_is = |name: &str, expected: &RecordId| {
            fields.get(name).and_then(JsonValue::as_str) == Some(expected.as_str())
        };

        match self {
            Self::ChatSection {
                community_id,
                section_id,
            } => {
                collection == "messages"
                    && field_is("community_id", community_id)
                    && field_is("section_id", section_id)
            },
            Self::PostComments { post_id } => {
                collection == "comments" && field_is("post_id", post_id)
            },
            Self::CommunityPolls { section_id, .. } => match collection {
                "polls" => field_is("section_id", section_id),
                "votes" => fields.contains_key("poll_id"),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic())
    }
}
