use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id::RecordId;
use super::user_summary::UserSummary;
use super::vote::Vote;

/// A poll with four fixed options, scoped to a community section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    /// Row identifier.
    pub id: RecordId,

    /// Creator's user id.
    pub user_id: RecordId,

    /// Owning community.
    pub community_id: RecordId,

    /// Owning section.
    pub section_id: RecordId,

    /// The poll question.
    pub question: String,

    /// Option A label.
    pub option_a: String,

    /// Option B label.
    pub option_b: String,

    /// Option C label.
    pub option_c: String,

    /// Option D label.
    pub option_d: String,

    /// Creation timestamp, used for ordering.
    pub created_at: DateTime<Utc>,

    /// Creator fields when the query embedded `users!user_id(...)`.
    #[serde(rename = "users", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,

    /// Votes when the query embedded the `votes` collection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub votes: Vec<Vote>,
}
