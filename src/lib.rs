//! # campus-link
//!
//! Client library for a hosted community/chat backend: communities with
//! chat sections, a public post wall with comments and likes, and section
//! polls. The service owns persistence, authentication enforcement, and
//! uniqueness constraints; this crate provides the typed store client, the
//! realtime subscription manager, and view-level composition of the two.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use campus_link::{CampusLinkClient, Session, chat::SectionChat};
//! use campus_link::models::RecordId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CampusLinkClient::builder()
//!     .base_url("https://campus.example.com")
//!     .api_key("pk_live_...")
//!     .build()?;
//!
//! let login = client.login("ada@example.edu", "secret123").await?;
//! let client = CampusLinkClient::builder()
//!     .base_url("https://campus.example.com")
//!     .auth(client.auth().with_token(login.access_token.clone()))
//!     .build()?;
//!
//! let mut session = Session::new(login.user);
//! session.select_community(RecordId::from("c-42"), "Makers");
//! session.select_section(RecordId::from("s-7"));
//!
//! let mut chat = SectionChat::open(&client, &session).await?;
//! while let Some(event) = chat.next_event().await {
//!     println!("{:?}", event?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Realtime model
//!
//! Each [`Scope`](models::Scope) (one chat section, one post's comments,
//! one section's polls) gets at most one live [`Channel`](realtime::Channel)
//! at a time. Channels deliver events in transport order, filter out
//! changes for other scopes before dispatch, and recover from transport
//! loss with exponential backoff (base 3 s, doubling, capped at 30 s,
//! counter reset on success). Closing a channel is idempotent, cancels any
//! pending retry, and stops delivery immediately.

pub mod auth;
pub mod chat;
pub mod client;
pub mod directory;
pub mod error;
pub mod event_handlers;
pub mod feed;
pub mod models;
pub mod polls;
pub mod realtime;
pub mod seen;
pub mod session;
pub mod store;
pub mod timeouts;

pub use auth::AuthProvider;
pub use client::{CampusLinkClient, CampusLinkClientBuilder};
pub use error::{CampusLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, EventHandlers};
pub use models::{
    ChangeEvent, ChangeKind, ChannelEvent, ChannelStatus, ConnectionOptions, Scope,
};
pub use realtime::{Channel, RealtimeManager};
pub use seen::SeenIds;
pub use session::Session;
pub use store::{OrderDirection, StoreClient};
pub use timeouts::{CampusLinkTimeouts, CampusLinkTimeoutsBuilder};
