use serde::{Deserialize, Serialize};

/// Author fields embedded into a row by a `users!user_id(...)` projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    /// Display name.
    pub name: String,

    /// Optional avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
