use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id::RecordId;
use super::user_summary::UserSummary;

/// A public wall post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Row identifier.
    pub id: RecordId,

    /// Author's user id (hidden by the view layer when `anonymous`).
    pub user_id: RecordId,

    /// Post body.
    pub content: String,

    /// Whether the author chose to post anonymously.
    #[serde(default)]
    pub anonymous: bool,

    /// Denormalized like counter, reconciled from `post_likes` counts.
    #[serde(default)]
    pub likes: i64,

    /// Creation timestamp, used for ordering.
    pub created_at: DateTime<Utc>,

    /// Author fields when the query embedded `users!user_id(...)`.
    #[serde(rename = "users", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}
