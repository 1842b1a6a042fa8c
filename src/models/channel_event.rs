use serde_json::Value as JsonValue;

use super::change_event::ChangeEvent;

/// An item delivered to a channel's consumer, in transport order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A persisted change in one of the channel's collections that passed
    /// the scope filter.
    Change(ChangeEvent),

    /// An ephemeral broadcast signal on the channel's topic (e.g. a typing
    /// indicator). Unordered with respect to changes and never persisted.
    Broadcast {
        /// Application-defined event name.
        event: String,
        /// Arbitrary JSON payload supplied by the publisher.
        payload: JsonValue,
    },
}
