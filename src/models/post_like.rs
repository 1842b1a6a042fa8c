use serde::{Deserialize, Serialize};

use super::record_id::RecordId;

/// A like on a wall post. The store enforces one like per `(post, user)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostLike {
    /// The liked post.
    pub post_id: RecordId,

    /// The liking user.
    pub user_id: RecordId,
}
