//! Session context: the signed-in user plus navigation state.
//!
//! Created from a successful login, updated as the user moves between
//! communities and sections, and dropped at logout. Views take the session
//! by reference to derive their scopes, so there is no process-wide
//! "current community" anywhere in the crate.

use crate::models::{RecordId, Scope, UserProfile};

/// The signed-in user's context for one client.
#[derive(Debug, Clone)]
pub struct Session {
    user: UserProfile,
    community: Option<SelectedCommunity>,
    section: Option<RecordId>,
}

#[derive(Debug, Clone)]
struct SelectedCommunity {
    id: RecordId,
    name: String,
}

impl Session {
    /// Start a session for a signed-in user, with nothing selected.
    pub fn new(user: UserProfile) -> Self {
        Self {
            user,
            community: None,
            section: None,
        }
    }

    /// The signed-in user.
    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    /// Enter a community; clears any selected section.
    pub fn select_community(&mut self, id: RecordId, name: impl Into<String>) {
        self.community = Some(SelectedCommunity {
            id,
            name: name.into(),
        });
        self.section = None;
    }

    /// Enter a section of the selected community.
    pub fn select_section(&mut self, id: RecordId) {
        self.section = Some(id);
    }

    /// Leave the current section, staying in the community.
    pub fn leave_section(&mut self) {
        self.section = None;
    }

    /// Leave the current community (and its section).
    pub fn leave_community(&mut self) {
        self.community = None;
        self.section = None;
    }

    /// The selected community's id, if any.
    pub fn community_id(&self) -> Option<&RecordId> {
        self.community.as_ref().map(|c| &c.id)
    }

    /// The selected community's name, if any.
    pub fn community_name(&self) -> Option<&str> {
        self.community.as_ref().map(|c| c.name.as_str())
    }

    /// The selected section's id, if any.
    pub fn section_id(&self) -> Option<&RecordId> {
        self.section.as_ref()
    }

    /// The chat scope for the current community/section selection.
    pub fn chat_scope(&self) -> Option<Scope> {
        Some(Scope::ChatSection {
            community_id: self.community_id()?.clone(),
            section_id: self.section_id()?.clone(),
        })
    }

    /// The polls scope for the current community/section selection.
    pub fn polls_scope(&self) -> Option<Scope> {
        Some(Scope::CommunityPolls {
            community_id: self.community_id()?.clone(),
            section_id: self.section_id()?.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> UserProfile {
        UserProfile {
            id: RecordId::from("u1"),
            name: "Ada".to_string(),
            email: "ada@example.edu".to_string(),
            avatar_url: None,
        }
    }

    #[test]
    fn test_fresh_session_has_no_scopes() {
        let session = Session::new(test_user());
        assert!(session.chat_scope().is_none());
        assert!(session.polls_scope().is_none());
    }

    #[test]
    fn test_section_selection_yields_scopes() {
        let mut session = Session::new(test_user());
        session.select_community(RecordId::from("c1"), "Makers");
        assert!(session.chat_scope().is_none(), "no section selected yet");

        session.select_section(RecordId::from("s1"));
        assert_eq!(
            session.chat_scope().unwrap().topic(),
            "community-chat-c1-s1"
        );
        assert_eq!(session.polls_scope().unwrap().topic(), "section-polls-s1");
    }

    #[test]
    fn test_community_change_clears_section() {
        let mut session = Session::new(test_user());
        session.select_community(RecordId::from("c1"), "Makers");
        session.select_section(RecordId::from("s1"));

        session.select_community(RecordId::from("c2"), "Runners");
        assert!(session.section_id().is_none());
        assert!(session.chat_scope().is_none());
        assert_eq!(session.community_name(), Some("Runners"));
    }

    #[test]
    fn test_leave_navigation() {
        let mut session = Session::new(test_user());
        session.select_community(RecordId::from("c1"), "Makers");
        session.select_section(RecordId::from("s1"));

        session.leave_section();
        assert!(session.section_id().is_none());
        assert!(session.community_id().is_some());

        session.leave_community();
        assert!(session.community_id().is_none());
    }
}
