use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id::RecordId;

/// A community row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    /// Row identifier.
    pub id: RecordId,

    /// Community name.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creator's user id.
    pub created_by: RecordId,

    /// Creation timestamp, used for ordering.
    pub created_at: DateTime<Utc>,
}
