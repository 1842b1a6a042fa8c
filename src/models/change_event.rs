use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::record_id::RecordId;

/// Kind of change carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// A change notification delivered on a channel.
///
/// Notifications are bare: they carry the affected row's id and its scope
/// fields (enough for filtering), never the full record. Consumers hydrate
/// inserts with a point read against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// A row was inserted into `collection`.
    Inserted {
        /// Collection the row belongs to.
        collection: String,
        /// The inserted row's id.
        id: RecordId,
        /// Scope fields from the notification payload.
        fields: HashMap<String, JsonValue>,
    },

    /// A row was deleted from `collection`.
    Deleted {
        /// Collection the row belonged to.
        collection: String,
        /// The deleted row's id.
        id: RecordId,
        /// Scope fields from the notification payload.
        fields: HashMap<String, JsonValue>,
    },
}

impl ChangeEvent {
    /// The affected row's id.
    pub fn id(&self) -> &RecordId {
        match self {
            Self::Inserted { id, .. } | Self::Deleted { id, .. } => id,
        }
    }

    /// The affected collection.
    pub fn collection(&self) -> &str {
        match self {
            Self::Inserted { collection, .. } | Self::Deleted { collection, .. } => collection,
        }
    }

    /// The scope fields carried by the notification.
    pub fn fields(&self) -> &HashMap<String, JsonValue> {
        match self {
            Self::Inserted { fields, .. } | Self::Deleted { fields, .. } => fields,
        }
    }

    /// The kind of change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Inserted { .. } => ChangeKind::Insert,
            Self::Deleted { .. } => ChangeKind::Delete,
        }
    }
}
