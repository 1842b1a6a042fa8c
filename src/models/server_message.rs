use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::change_event::ChangeKind;
use super::record_id::RecordId;

/// Server-to-client frames on the realtime WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledgement of a successful subscribe.
    SubscribeAck {
        /// The topic that was registered.
        topic: String,
    },

    /// Bare change notification: the affected row's id plus its scope
    /// fields. Full records are fetched by the consumer when needed.
    Change {
        /// The topic this notification was routed to.
        topic: String,
        /// Collection the row belongs to.
        collection: String,
        /// Whether the row was inserted or deleted.
        change_type: ChangeKind,
        /// The affected row's id.
        id: RecordId,
        /// Scope fields (community, section, post) from the row.
        #[serde(default)]
        fields: HashMap<String, JsonValue>,
    },

    /// An ephemeral broadcast published by some client on this topic.
    Broadcast {
        /// The topic the signal was published on.
        topic: String,
        /// Application-defined event name.
        event: String,
        /// Publisher-supplied payload.
        payload: JsonValue,
    },

    /// Error notification from the server.
    Error {
        /// The topic related to the error, when known.
        #[serde(default)]
        topic: Option<String>,
        /// Error code.
        code: String,
        /// Human-readable error message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_frame_parses() {
        let raw = r#"{
            "type": "change",
            "topic": "community-chat-c1-s1",
            "collection": "messages",
            "change_type": "insert",
            "id": "m-42",
            "fields": { "community_id": "c1", "section_id": "s1" }
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ServerMessage::Change {
                topic,
                collection,
                change_type,
                id,
                fields,
            } => {
                assert_eq!(topic, "community-chat-c1-s1");
                assert_eq!(collection, "messages");
                assert_eq!(change_type, ChangeKind::Insert);
                assert_eq!(id.as_str(), "m-42");
                assert_eq!(fields["section_id"], "s1");
            },
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_error_frame_without_topic() {
        let raw = r#"{ "type": "error", "code": "subscription_limit", "message": "too many" }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ServerMessage::Error { topic, code, .. } => {
                assert!(topic.is_none());
                assert_eq!(code, "subscription_limit");
            },
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_subscribe_frame_shape() {
        use super::super::client_message::ClientMessage;
        use super::super::event_filter::EventFilter;

        let frame = ClientMessage::Subscribe {
            topic: "comments-p1".to_string(),
            filters: vec![EventFilter::new("comments", vec![ChangeKind::Insert])],
        };
        let json: JsonValue = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "subscribe");
        assert_eq!(json["topic"], "comments-p1");
        assert_eq!(json["filters"][0]["collection"], "comments");
        assert_eq!(json["filters"][0]["events"][0], "insert");
    }
}
