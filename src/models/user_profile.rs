use serde::{Deserialize, Serialize};

use super::record_id::RecordId;

/// A user's profile row from the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Row identifier (matches the identity provider's user id).
    pub id: RecordId,

    /// Display name.
    pub name: String,

    /// Account email.
    pub email: String,

    /// Optional avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
