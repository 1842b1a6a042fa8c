use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::event_filter::EventFilter;

/// Client-to-server frames on the realtime WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register interest in a topic's change notifications.
    Subscribe {
        /// The topic (scope key) to subscribe to.
        topic: String,
        /// Collection/event filters applied server-side.
        filters: Vec<EventFilter>,
    },

    /// Drop a topic subscription.
    Unsubscribe {
        /// The topic to unsubscribe from.
        topic: String,
    },

    /// Publish an ephemeral broadcast signal to a topic. Fire-and-forget:
    /// unordered, not persisted, no acknowledgement.
    Publish {
        /// The topic to publish on.
        topic: String,
        /// Application-defined event name.
        event: String,
        /// Arbitrary JSON payload.
        payload: JsonValue,
    },
}
