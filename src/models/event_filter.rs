use serde::{Deserialize, Serialize};

use super::change_event::ChangeKind;

/// One collection/event-kind pair a subscription registers interest in.
///
/// The transport applies these coarse filters server-side; fine-grained
/// scope matching (community, section, post) stays client-side because the
/// service publishes collection-wide notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Collection to watch.
    pub collection: String,

    /// Change kinds of interest.
    pub events: Vec<ChangeKind>,
}

impl EventFilter {
    /// Convenience constructor.
    pub fn new(collection: impl Into<String>, events: Vec<ChangeKind>) -> Self {
        Self {
            collection: collection.into(),
            events,
        }
    }
}
