use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id::RecordId;
use super::user_profile::UserProfile;

/// A community membership row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityMember {
    /// Row identifier.
    pub id: RecordId,

    /// The community joined.
    pub community_id: RecordId,

    /// The joining user.
    pub user_id: RecordId,

    /// Join timestamp, used for ordering the member list.
    pub joined_at: DateTime<Utc>,

    /// Member profile when the query embedded `users(...)`.
    #[serde(rename = "users", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}
