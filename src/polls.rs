//! Section polls: loading with votes, tallies, voting, live refresh.
//!
//! Poll cards re-render wholesale on any in-scope change, so the channel's
//! events collapse into refresh signals instead of row-level updates. Vote
//! notifications carry only a poll id; the view refines them against the
//! polls it knows about before signalling.

use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::client::CampusLinkClient;
use crate::error::{CampusLinkError, Result};
use crate::models::{
    ChangeEvent, ChannelEvent, Poll, PollOption, RecordId, Scope, UserProfile, Vote,
};
use crate::realtime::Channel;
use crate::session::Session;
use crate::store::{OrderDirection, StoreClient};
use crate::timeouts::CampusLinkTimeouts;

/// Projection expanding the creator and the votes onto each poll row.
const POLL_WITH_VOTES: &str = "*, users!user_id(name, avatar_url), votes(id, poll_id, user_id, option)";

/// A change that warrants re-rendering the poll list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    /// A poll or vote in this section changed; reload via [`SectionPolls::load`].
    Refresh,
}

#[derive(Serialize)]
struct NewPoll<'a> {
    user_id: &'a RecordId,
    community_id: &'a RecordId,
    section_id: &'a RecordId,
    question: &'a str,
    option_a: &'a str,
    option_b: &'a str,
    option_c: &'a str,
    option_d: &'a str,
}

#[derive(Serialize)]
struct NewVote<'a> {
    poll_id: &'a RecordId,
    user_id: &'a RecordId,
    option: PollOption,
}

/// Per-option counts for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTally {
    counts: [usize; 4],
    total: usize,
}

impl PollTally {
    fn slot(option: PollOption) -> usize {
        match option {
            PollOption::A => 0,
            PollOption::B => 1,
            PollOption::C => 2,
            PollOption::D => 3,
        }
    }

    /// Tally a poll's votes.
    pub fn from_votes(votes: &[Vote]) -> Self {
        let mut counts = [0usize; 4];
        for vote in votes {
            counts[Self::slot(vote.option)] += 1;
        }
        Self {
            counts,
            total: votes.len(),
        }
    }

    /// Votes for one option.
    pub fn count(&self, option: PollOption) -> usize {
        self.counts[Self::slot(option)]
    }

    /// Total votes cast.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Percentage of votes for one option, rounded to the nearest integer;
    /// 0 when nobody has voted.
    pub fn percent(&self, option: PollOption) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.count(option) as f64 / self.total as f64) * 100.0).round() as u32
    }

    /// The option the given user voted for, if any.
    pub fn user_vote(votes: &[Vote], user_id: &RecordId) -> Option<PollOption> {
        votes
            .iter()
            .find(|vote| &vote.user_id == user_id)
            .map(|vote| vote.option)
    }
}

/// A live view over one section's polls.
pub struct SectionPolls {
    store: StoreClient,
    channel: Channel,
    community_id: RecordId,
    section_id: RecordId,
    user: UserProfile,
    known_polls: HashSet<RecordId>,
    timeouts: CampusLinkTimeouts,
}

impl SectionPolls {
    /// Open the polls view for the session's selected community/section.
    pub async fn open(client: &CampusLinkClient, session: &Session) -> Result<Self> {
        let (community_id, section_id) = match (session.community_id(), session.section_id()) {
            (Some(community), Some(section)) => (community.clone(), section.clone()),
            _ => {
                return Err(CampusLinkError::ConfigurationError(
                    "opening polls requires a selected community and section".into(),
                ));
            },
        };
        let scope = Scope::CommunityPolls {
            community_id: community_id.clone(),
            section_id: section_id.clone(),
        };

        let channel = client.realtime().open(scope)?;

        let mut view = Self {
            store: client.store().clone(),
            channel,
            community_id,
            section_id,
            user: session.user().clone(),
            known_polls: HashSet::new(),
            timeouts: client.timeouts().clone(),
        };
        // Prime the known-poll set so vote notifications can be refined.
        view.load().await?;
        Ok(view)
    }

    /// Load the section's polls with their votes, newest first. Bounded by
    /// the initial-load timeout. Also refreshes the known-poll set used to
    /// refine vote notifications.
    pub async fn load(&mut self) -> Result<Vec<Poll>> {
        let load = self
            .store
            .from("polls")
            .select(POLL_WITH_VOTES)
            .eq("community_id", &self.community_id)
            .eq("section_id", &self.section_id)
            .order("created_at", OrderDirection::Descending)
            .fetch::<Poll>();
        let polls = tokio::time::timeout(self.timeouts.initial_load_timeout, load)
            .await
            .map_err(|_| {
                CampusLinkError::TimeoutError(format!(
                    "Loading polls took longer than {:?}",
                    self.timeouts.initial_load_timeout
                ))
            })??;

        self.known_polls = polls.iter().map(|poll| poll.id.clone()).collect();
        Ok(polls)
    }

    /// Wait for the next change that warrants a reload. Returns `None`
    /// once the view is closed.
    pub async fn next_event(&mut self) -> Option<Result<PollEvent>> {
        loop {
            let item = self.channel.next().await?;
            let event = match item {
                Ok(event) => event,
                Err(e) => return Some(Err(e)),
            };

            let ChannelEvent::Change(change) = event else {
                continue;
            };
            match &change {
                ChangeEvent::Inserted { collection, id, fields } => match collection.as_str() {
                    "polls" => {
                        self.known_polls.insert(id.clone());
                        return Some(Ok(PollEvent::Refresh));
                    },
                    "votes" => {
                        // Votes carry only the poll id; refine against the
                        // polls this section knows about.
                        let in_scope = fields
                            .get("poll_id")
                            .and_then(serde_json::Value::as_str)
                            .map_or(false, |poll_id| {
                                self.known_polls.contains(&RecordId::from(poll_id))
                            });
                        if in_scope {
                            return Some(Ok(PollEvent::Refresh));
                        }
                        debug!("[polls] vote for unknown poll dropped");
                        continue;
                    },
                    _ => continue,
                },
                ChangeEvent::Deleted { collection, id, .. } => {
                    if collection == "polls" && self.known_polls.remove(id) {
                        return Some(Ok(PollEvent::Refresh));
                    }
                    continue;
                },
            }
        }
    }

    /// Create a poll in this section with its four options.
    pub async fn create_poll(&mut self, question: &str, options: [&str; 4]) -> Result<Poll> {
        if question.trim().is_empty() || options.iter().any(|option| option.trim().is_empty()) {
            return Err(CampusLinkError::ConfigurationError(
                "a poll needs a question and all four options".into(),
            ));
        }
        let row = NewPoll {
            user_id: &self.user.id,
            community_id: &self.community_id,
            section_id: &self.section_id,
            question: question.trim(),
            option_a: options[0].trim(),
            option_b: options[1].trim(),
            option_c: options[2].trim(),
            option_d: options[3].trim(),
        };
        let poll: Poll = self.store.insert("polls", &row, None).await?;
        self.known_polls.insert(poll.id.clone());
        Ok(poll)
    }

    /// Cast the user's vote on a poll.
    ///
    /// The store enforces one vote per `(poll, user)`; a second vote fails
    /// with an error whose
    /// [`is_unique_violation`](CampusLinkError::is_unique_violation)
    /// reports `true`, letting callers present "already voted" instead of
    /// a generic failure. Never retried automatically.
    pub async fn vote(&self, poll_id: &RecordId, option: PollOption) -> Result<Vote> {
        let row = NewVote {
            poll_id,
            user_id: &self.user.id,
            option,
        };
        self.store.insert("votes", &row, None).await
    }

    /// Delete one of the user's own polls; votes cascade server-side.
    pub async fn delete_poll(&mut self, poll_id: &RecordId) -> Result<()> {
        self.store
            .delete("polls")
            .eq("id", poll_id)
            .eq("user_id", &self.user.id)
            .execute()
            .await?;
        self.known_polls.remove(poll_id);
        Ok(())
    }

    /// Close the view and its channel. Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }

    /// Returns `true` once the view's channel is closed.
    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}
