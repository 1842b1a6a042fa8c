//! Public post wall: paginated posts, likes, and per-post comment threads.
//!
//! Posts themselves are request/response only; comment threads get a live
//! channel per post, with the same hydrate-and-claim discipline as chat.

use std::collections::HashSet;

use log::{debug, warn};
use serde::Serialize;

use crate::client::CampusLinkClient;
use crate::error::{CampusLinkError, Result};
use crate::models::{ChangeEvent, ChannelEvent, Comment, Post, RecordId, Scope, UserProfile};
use crate::realtime::Channel;
use crate::seen::SeenIds;
use crate::store::{OrderDirection, StoreClient};
use crate::timeouts::CampusLinkTimeouts;

/// Projection expanding the author onto each row.
const WITH_AUTHOR: &str = "*, users!user_id(name, avatar_url)";

/// Posts per page, newest first.
const PAGE_SIZE: u64 = 15;

/// One page of the wall plus the caller's like state.
#[derive(Debug, Clone)]
pub struct FeedPage {
    /// Posts in this page, newest first.
    pub posts: Vec<Post>,
    /// Ids of posts in this page the caller has liked.
    pub liked: HashSet<RecordId>,
}

#[derive(Serialize)]
struct NewPost<'a> {
    user_id: &'a RecordId,
    content: &'a str,
    anonymous: bool,
    likes: i64,
}

#[derive(Serialize)]
struct NewLike<'a> {
    post_id: &'a RecordId,
    user_id: &'a RecordId,
}

#[derive(Serialize)]
struct NewComment<'a> {
    post_id: &'a RecordId,
    user_id: &'a RecordId,
    content: &'a str,
    anonymous: bool,
}

#[derive(serde::Deserialize)]
struct LikeRef {
    post_id: RecordId,
}

/// Paginated view over the public post wall.
pub struct PostFeed {
    store: StoreClient,
    user: UserProfile,
    timeouts: CampusLinkTimeouts,
}

impl PostFeed {
    /// Create a feed view for the signed-in user.
    pub fn new(client: &CampusLinkClient, user: UserProfile) -> Self {
        Self {
            store: client.store().clone(),
            user,
            timeouts: client.timeouts().clone(),
        }
    }

    /// Load one page of posts (newest first) together with the caller's
    /// like state for that page. Bounded by the initial-load timeout.
    pub async fn load(&self, offset: u64) -> Result<FeedPage> {
        let posts_load = self
            .store
            .from("posts")
            .select(WITH_AUTHOR)
            .order("created_at", OrderDirection::Descending)
            .range(offset, offset + PAGE_SIZE - 1)
            .fetch::<Post>();
        let posts = tokio::time::timeout(self.timeouts.initial_load_timeout, posts_load)
            .await
            .map_err(|_| {
                CampusLinkError::TimeoutError(format!(
                    "Loading posts took longer than {:?}",
                    self.timeouts.initial_load_timeout
                ))
            })??;

        let likes = self
            .store
            .from("post_likes")
            .select("post_id")
            .eq("user_id", &self.user.id)
            .fetch::<LikeRef>()
            .await?;
        let liked: HashSet<RecordId> = likes.into_iter().map(|like| like.post_id).collect();

        Ok(FeedPage { posts, liked })
    }

    /// Publish a new post, optionally anonymous. Returns the created row
    /// with its author embed.
    pub async fn create_post(&self, content: &str, anonymous: bool) -> Result<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CampusLinkError::ConfigurationError(
                "cannot publish an empty post".into(),
            ));
        }
        let row = NewPost {
            user_id: &self.user.id,
            content,
            anonymous,
            likes: 0,
        };
        self.store.insert("posts", &row, Some(WITH_AUTHOR)).await
    }

    /// Delete a post. The store enforces that only the owner may delete.
    pub async fn delete_post(&self, post_id: &RecordId) -> Result<()> {
        self.store
            .delete("posts")
            .eq("id", post_id)
            .execute()
            .await
    }

    /// Set or clear the caller's like on a post, then reconcile the
    /// denormalized counter from an exact count. Returns the new count.
    ///
    /// The caller applies its optimistic UI first and reverts on error;
    /// this method only reports the authoritative state.
    pub async fn set_liked(&self, post_id: &RecordId, liked: bool) -> Result<u64> {
        if liked {
            let row = NewLike {
                post_id,
                user_id: &self.user.id,
            };
            match self
                .store
                .insert::<_, serde_json::Value>("post_likes", &row, None)
                .await
            {
                Ok(_) => {},
                // A duplicate like is already the desired state.
                Err(e) if e.is_unique_violation() => {
                    debug!("[feed] like for {} already present", post_id);
                },
                Err(e) => return Err(e),
            }
        } else {
            self.store
                .delete("post_likes")
                .eq("post_id", post_id)
                .eq("user_id", &self.user.id)
                .execute()
                .await?;
        }

        let count = self
            .store
            .from("post_likes")
            .eq("post_id", post_id)
            .count()
            .await?;

        self.store
            .update("posts", serde_json::json!({ "likes": count }))
            .eq("id", post_id)
            .execute()
            .await?;

        Ok(count)
    }

    /// Open the live comment thread for one post.
    pub async fn open_comments(
        &self,
        client: &CampusLinkClient,
        post_id: RecordId,
    ) -> Result<CommentThread> {
        CommentThread::open(client, post_id, self.user.clone()).await
    }
}

/// A live view over one post's comments.
pub struct CommentThread {
    store: StoreClient,
    channel: Channel,
    post_id: RecordId,
    user: UserProfile,
    seen: SeenIds,
    comments: Vec<Comment>,
}

impl CommentThread {
    /// Load a post's comments (oldest first) and subscribe to new ones.
    pub async fn open(
        client: &CampusLinkClient,
        post_id: RecordId,
        user: UserProfile,
    ) -> Result<Self> {
        let store = client.store().clone();
        let timeouts = client.timeouts().clone();

        let load = store
            .from("comments")
            .select(WITH_AUTHOR)
            .eq("post_id", &post_id)
            .order("created_at", OrderDirection::Ascending)
            .fetch::<Comment>();
        let comments = tokio::time::timeout(timeouts.initial_load_timeout, load)
            .await
            .map_err(|_| {
                CampusLinkError::TimeoutError(format!(
                    "Loading comments took longer than {:?}",
                    timeouts.initial_load_timeout
                ))
            })??;

        let channel = client.realtime().open(Scope::PostComments {
            post_id: post_id.clone(),
        })?;

        let mut seen = SeenIds::new();
        seen.extend(comments.iter().map(|c| c.id.clone()));

        Ok(Self {
            store,
            channel,
            post_id,
            user,
            seen,
            comments,
        })
    }

    /// The initial comment snapshot, oldest first.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Receive the next new comment, hydrated with its author. Returns
    /// `None` once the thread is closed.
    pub async fn next_comment(&mut self) -> Option<Result<Comment>> {
        loop {
            let item = self.channel.next().await?;
            let event = match item {
                Ok(event) => event,
                Err(e) => return Some(Err(e)),
            };

            let ChannelEvent::Change(ChangeEvent::Inserted { collection, id, .. }) = event else {
                continue;
            };
            if collection != "comments" {
                continue;
            }
            if !self.seen.claim(&id) {
                debug!("[comments] duplicate delivery of {} suppressed", id);
                continue;
            }

            let hydrated = self
                .store
                .from("comments")
                .select(WITH_AUTHOR)
                .eq("id", &id)
                .maybe_one::<Comment>()
                .await;
            match hydrated {
                Ok(Some(comment)) => {
                    if self.channel.is_closed() {
                        return None;
                    }
                    return Some(Ok(comment));
                },
                Ok(None) => {
                    warn!("[comments] comment {} gone before hydration", id);
                    continue;
                },
                Err(e) => {
                    warn!("[comments] hydration of {} failed: {}", id, e);
                    continue;
                },
            }
        }
    }

    /// Submit a comment and materialize the echoed row immediately; the
    /// later change notification for the same insert is suppressed.
    pub async fn submit_comment(&mut self, content: &str) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CampusLinkError::ConfigurationError(
                "cannot submit an empty comment".into(),
            ));
        }
        let row = NewComment {
            post_id: &self.post_id,
            user_id: &self.user.id,
            content,
            anonymous: false,
        };
        let comment: Comment = self.store.insert("comments", &row, Some(WITH_AUTHOR)).await?;
        self.seen.claim(&comment.id);
        Ok(comment)
    }

    /// The post this thread belongs to.
    pub fn post_id(&self) -> &RecordId {
        &self.post_id
    }

    /// Close the thread's channel. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }

    /// Returns `true` once the thread's channel is closed.
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_post_wire_shape() {
        let user_id = RecordId::from("u1");
        let row = NewPost {
            user_id: &user_id,
            content: "first!",
            anonymous: true,
            likes: 0,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["anonymous"], true);
        assert_eq!(value["likes"], 0);
    }

    #[test]
    fn test_like_ref_parses_projected_row() {
        let like: LikeRef = serde_json::from_str(r#"{ "post_id": "p1" }"#).unwrap();
        assert_eq!(like.post_id.as_str(), "p1");
    }
}
