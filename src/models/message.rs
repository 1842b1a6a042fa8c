use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record_id::RecordId;
use super::user_summary::UserSummary;

/// A chat message row, optionally carrying its author embed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Row identifier.
    pub id: RecordId,

    /// Owning community.
    pub community_id: RecordId,

    /// Owning section.
    pub section_id: RecordId,

    /// Sender's user id.
    pub user_id: RecordId,

    /// Message body.
    pub content: String,

    /// Creation timestamp, used for ordering.
    pub created_at: DateTime<Utc>,

    /// Author fields when the query embedded `users!user_id(...)`.
    #[serde(rename = "users", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_author_embed() {
        let raw = r#"{
            "id": "m-1",
            "community_id": "c-1",
            "section_id": "s-1",
            "user_id": "u-1",
            "content": "hello",
            "created_at": "2025-11-02T10:15:30Z",
            "users": { "name": "Ada", "avatar_url": null }
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.id.as_str(), "m-1");
        assert_eq!(msg.author.as_ref().unwrap().name, "Ada");
    }

    #[test]
    fn test_deserialize_without_embed() {
        let raw = r#"{
            "id": "m-2",
            "community_id": "c-1",
            "section_id": "s-1",
            "user_id": "u-1",
            "content": "bare row",
            "created_at": "2025-11-02T10:15:31Z"
        }"#;
        let msg: Message = serde_json::from_str(raw).unwrap();
        assert!(msg.author.is_none());
    }
}
