//! Community directory: browsing and managing communities, sections, and
//! memberships. Plain request/response over the store; nothing here is
//! realtime.

use serde::Serialize;

use crate::client::CampusLinkClient;
use crate::error::{CampusLinkError, Result};
use crate::models::{Community, CommunityMember, RecordId, Section, UserProfile};
use crate::store::{OrderDirection, StoreClient};
use crate::timeouts::CampusLinkTimeouts;

#[derive(Serialize)]
struct NewCommunity<'a> {
    name: &'a str,
    description: &'a str,
    created_by: &'a RecordId,
}

#[derive(Serialize)]
struct NewSection<'a> {
    community_id: &'a RecordId,
    name: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct NewMembership<'a> {
    community_id: &'a RecordId,
    user_id: &'a RecordId,
}

#[derive(serde::Deserialize)]
struct MembershipRef {
    id: RecordId,
}

/// Directory operations for the signed-in user.
pub struct Directory {
    store: StoreClient,
    user: UserProfile,
    timeouts: CampusLinkTimeouts,
}

impl Directory {
    /// Create a directory view for the signed-in user.
    pub fn new(client: &CampusLinkClient, user: UserProfile) -> Self {
        Self {
            store: client.store().clone(),
            user,
            timeouts: client.timeouts().clone(),
        }
    }

    /// List all communities, newest first. Bounded by the initial-load
    /// timeout.
    pub async fn communities(&self) -> Result<Vec<Community>> {
        let load = self
            .store
            .from("communities")
            .order("created_at", OrderDirection::Descending)
            .fetch::<Community>();
        tokio::time::timeout(self.timeouts.initial_load_timeout, load)
            .await
            .map_err(|_| {
                CampusLinkError::TimeoutError(format!(
                    "Loading communities took longer than {:?}",
                    self.timeouts.initial_load_timeout
                ))
            })?
    }

    /// List a community's sections, oldest first.
    pub async fn sections(&self, community_id: &RecordId) -> Result<Vec<Section>> {
        self.store
            .from("sections")
            .eq("community_id", community_id)
            .order("created_at", OrderDirection::Ascending)
            .fetch::<Section>()
            .await
    }

    /// Create a community. Names must be at least 3 characters.
    pub async fn create_community(&self, name: &str, description: &str) -> Result<Community> {
        let name = name.trim();
        if name.len() < 3 {
            return Err(CampusLinkError::ConfigurationError(
                "community name must be at least 3 characters".into(),
            ));
        }
        let row = NewCommunity {
            name,
            description: description.trim(),
            created_by: &self.user.id,
        };
        self.store.insert("communities", &row, None).await
    }

    /// Create a section in a community. Names must be at least 2 characters.
    pub async fn create_section(
        &self,
        community_id: &RecordId,
        name: &str,
        description: &str,
    ) -> Result<Section> {
        let name = name.trim();
        if name.len() < 2 {
            return Err(CampusLinkError::ConfigurationError(
                "section name must be at least 2 characters".into(),
            ));
        }
        let row = NewSection {
            community_id,
            name,
            description: description.trim(),
        };
        self.store.insert("sections", &row, None).await
    }

    /// List a community's members, in join order, with their profiles.
    pub async fn members(&self, community_id: &RecordId) -> Result<Vec<CommunityMember>> {
        self.store
            .from("community_members")
            .select("*, users(id, name, email, avatar_url)")
            .eq("community_id", community_id)
            .order("joined_at", OrderDirection::Ascending)
            .fetch::<CommunityMember>()
            .await
    }

    /// Whether the signed-in user is a member of the community.
    pub async fn is_member(&self, community_id: &RecordId) -> Result<bool> {
        Ok(self.membership(community_id).await?.is_some())
    }

    /// Join or leave a community. Returns `true` when the user is a member
    /// afterwards.
    pub async fn toggle_membership(&self, community_id: &RecordId) -> Result<bool> {
        match self.membership(community_id).await? {
            Some(_) => {
                self.store
                    .delete("community_members")
                    .eq("community_id", community_id)
                    .eq("user_id", &self.user.id)
                    .execute()
                    .await?;
                Ok(false)
            },
            None => {
                let row = NewMembership {
                    community_id,
                    user_id: &self.user.id,
                };
                self.store
                    .insert::<_, serde_json::Value>("community_members", &row, None)
                    .await?;
                Ok(true)
            },
        }
    }

    async fn membership(&self, community_id: &RecordId) -> Result<Option<RecordId>> {
        let row = self
            .store
            .from("community_members")
            .select("id")
            .eq("community_id", community_id)
            .eq("user_id", &self.user.id)
            .maybe_one::<MembershipRef>()
            .await?;
        Ok(row.map(|membership| membership.id))
    }
}
