use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id::RecordId;

/// A chat section within a community.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Row identifier.
    pub id: RecordId,

    /// Owning community.
    pub community_id: RecordId,

    /// Section name.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation timestamp, used for ordering.
    pub created_at: DateTime<Utc>,
}
