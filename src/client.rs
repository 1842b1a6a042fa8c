//! Main campus-link client with builder pattern.
//!
//! Provides the primary interface for connecting to a campus backend
//! deployment: the typed store, the realtime manager, and the login call.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthProvider;
use crate::error::{CampusLinkError, Result};
use crate::event_handlers::EventHandlers;
use crate::models::{ConnectionOptions, LoginRequest, LoginResponse};
use crate::realtime::RealtimeManager;
use crate::store::StoreClient;
use crate::timeouts::CampusLinkTimeouts;

/// Main campus-link client.
///
/// Use [`CampusLinkClientBuilder`] to construct instances with custom
/// configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use campus_link::CampusLinkClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = CampusLinkClient::builder()
///     .base_url("http://localhost:8000")
///     .api_key("pk_test_local")
///     .build()?;
///
/// let login = client.login("ada@example.edu", "secret123").await?;
/// println!("signed in as {}", login.user.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CampusLinkClient {
    base_url: String,
    http: reqwest::Client,
    auth: AuthProvider,
    store: StoreClient,
    realtime: Arc<RealtimeManager>,
    timeouts: CampusLinkTimeouts,
}

impl CampusLinkClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> CampusLinkClientBuilder {
        CampusLinkClientBuilder::new()
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Typed CRUD access to the store's collections.
    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    /// The realtime subscription manager.
    pub fn realtime(&self) -> &RealtimeManager {
        &self.realtime
    }

    /// The configured timeouts.
    pub fn timeouts(&self) -> &CampusLinkTimeouts {
        &self.timeouts
    }

    /// The configured authentication provider.
    pub fn auth(&self) -> &AuthProvider {
        &self.auth
    }

    /// Sign in with email and password.
    ///
    /// Returns the session token and the user's profile. Build a new
    /// client with [`AuthProvider::with_token`] for authenticated calls,
    /// and a [`Session`](crate::session::Session) from the profile:
    ///
    /// ```rust,no_run
    /// use campus_link::{CampusLinkClient, Session};
    ///
    /// # async fn example() -> campus_link::Result<()> {
    /// let anon = CampusLinkClient::builder()
    ///     .base_url("http://localhost:8000")
    ///     .api_key("pk_test_local")
    ///     .build()?;
    ///
    /// let login = anon.login("ada@example.edu", "secret123").await?;
    /// let client = CampusLinkClient::builder()
    ///     .base_url("http://localhost:8000")
    ///     .auth(anon.auth().with_token(login.access_token.clone()))
    ///     .build()?;
    /// let session = Session::new(login.user);
    /// # let _ = (client, session);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let url = format!("{}/v1/auth/login", self.base_url);
        log::debug!("[LOGIN] authenticating '{}' at {}", email, url);

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .auth
            .apply_to_request(self.http.post(&url).json(&request))?
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(CampusLinkError::AuthenticationError(format!(
                "Login failed ({}): {}",
                status, text
            )));
        }

        let login = response.json::<LoginResponse>().await?;
        log::debug!("[LOGIN] authenticated '{}'", email);
        Ok(login)
    }
}

/// Builder for configuring [`CampusLinkClient`] instances.
pub struct CampusLinkClientBuilder {
    base_url: Option<String>,
    auth: AuthProvider,
    max_retries: u32,
    timeouts: CampusLinkTimeouts,
    connection_options: ConnectionOptions,
    event_handlers: EventHandlers,
}

impl CampusLinkClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            auth: AuthProvider::none(),
            max_retries: 3,
            timeouts: CampusLinkTimeouts::default(),
            connection_options: ConnectionOptions::default(),
            event_handlers: EventHandlers::new(),
        }
    }

    /// Set the base URL of the backend deployment.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the application's public API key (anonymous access).
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.auth = AuthProvider::api_key(key.into());
        self
    }

    /// Set the authentication provider directly.
    pub fn auth(mut self, auth: AuthProvider) -> Self {
        self.auth = auth;
        self
    }

    /// Set the maximum number of retries for idempotent store reads.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the timeout configuration for all operations.
    pub fn timeouts(mut self, timeouts: CampusLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set reconnection behavior for realtime channels.
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    /// Set connection lifecycle callbacks.
    pub fn event_handlers(mut self, handlers: EventHandlers) -> Self {
        self.event_handlers = handlers;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CampusLinkClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| CampusLinkError::ConfigurationError("base_url is required".into()))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        // Pooled HTTP client: keep-alive connections avoid per-request TCP
        // handshakes against the store.
        let http = reqwest::Client::builder()
            .timeout(self.timeouts.request_timeout)
            .connect_timeout(self.timeouts.connection_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| CampusLinkError::ConfigurationError(e.to_string()))?;

        let store = StoreClient::new(
            base_url.clone(),
            http.clone(),
            self.auth.clone(),
            self.max_retries,
        );

        let realtime = RealtimeManager::new(
            base_url.clone(),
            self.auth.clone(),
            self.timeouts.clone(),
            self.connection_options,
            self.event_handlers,
        );

        Ok(CampusLinkClient {
            base_url,
            http,
            auth: self.auth,
            store,
            realtime: Arc::new(realtime),
            timeouts: self.timeouts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let result = CampusLinkClient::builder()
            .base_url("http://localhost:8000")
            .api_key("pk_test")
            .timeouts(CampusLinkTimeouts::fast())
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_builder_missing_url() {
        let result = CampusLinkClient::builder().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let client = CampusLinkClient::builder()
            .base_url("http://localhost:8000/")
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
