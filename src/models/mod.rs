//! Data models for the campus-link client library.
//!
//! Record types mirror the service's collections; the wire types define the
//! realtime WebSocket frames and the channel-facing event/status enums.

pub mod change_event;
pub mod channel_event;
pub mod channel_status;
pub mod client_message;
pub mod comment;
pub mod community;
pub mod connection_options;
pub mod event_filter;
pub mod login;
pub mod membership;
pub mod message;
pub mod poll;
pub mod post;
pub mod post_like;
pub mod record_id;
pub mod scope;
pub mod section;
pub mod server_message;
pub mod store_error;
pub mod user_profile;
pub mod user_summary;
pub mod vote;

pub use change_event::{ChangeEvent, ChangeKind};
pub use channel_event::ChannelEvent;
pub use channel_status::ChannelStatus;
pub use client_message::ClientMessage;
pub use comment::Comment;
pub use community::Community;
pub use connection_options::ConnectionOptions;
pub use event_filter::EventFilter;
pub use login::{LoginRequest, LoginResponse};
pub use membership::CommunityMember;
pub use message::Message;
pub use poll::Poll;
pub use post::Post;
pub use post_like::PostLike;
pub use record_id::RecordId;
pub use scope::Scope;
pub use section::Section;
pub use server_message::ServerMessage;
pub use store_error::{StoreErrorBody, UNIQUE_VIOLATION_CODE};
pub use user_profile::UserProfile;
pub use user_summary::UserSummary;
pub use vote::{PollOption, Vote};
