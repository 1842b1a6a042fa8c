use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id::RecordId;
use super::user_summary::UserSummary;

/// A comment on a wall post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Row identifier.
    pub id: RecordId,

    /// The post this comment belongs to.
    pub post_id: RecordId,

    /// Author's user id.
    pub user_id: RecordId,

    /// Comment body.
    pub content: String,

    /// Whether the author chose to comment anonymously.
    #[serde(default)]
    pub anonymous: bool,

    /// Creation timestamp, used for ordering.
    pub created_at: DateTime<Utc>,

    /// Author fields when the query embedded `users!user_id(...)`.
    #[serde(rename = "users", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}
