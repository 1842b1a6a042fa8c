//! Authentication provider for the campus-link client.
//!
//! Attaches the service API key and, when present, the signed-in user's
//! bearer token to HTTP requests and to the WebSocket handshake.

use crate::error::Result;

/// Authentication credentials for the campus backend.
///
/// Every deployment issues a public API key that identifies the client
/// application; signed-in users additionally carry a bearer token obtained
/// from the login endpoint. Row-level authorization is enforced by the
/// service, not by this client.
///
/// # Examples
///
/// ```rust
/// use campus_link::AuthProvider;
///
/// // Anonymous access with just the application key
/// let auth = AuthProvider::api_key("pk_live_...".to_string());
///
/// // Authenticated user session
/// let auth = AuthProvider::bearer("pk_live_...".to_string(), "eyJhbGc...".to_string());
/// ```
#[derive(Debug, Clone)]
pub enum AuthProvider {
    /// Application API key only (anonymous access).
    ApiKey(String),

    /// Application API key plus a user session token.
    Bearer {
        /// The application's public API key.
        api_key: String,
        /// The user's session token from the login endpoint.
        token: String,
    },

    /// No authentication (local development against an open service).
    None,
}

impl AuthProvider {
    /// Anonymous access with the application's public API key.
    pub fn api_key(key: String) -> Self {
        Self::ApiKey(key)
    }

    /// Authenticated access: application key plus a user session token.
    pub fn bearer(api_key: String, token: String) -> Self {
        Self::Bearer { api_key, token }
    }

    /// No authentication (local development only).
    pub fn none() -> Self {
        Self::None
    }

    /// Derive an authenticated provider from this one by adding a user
    /// session token, keeping the application key.
    pub fn with_token(&self, token: String) -> Self {
        match self {
            Self::ApiKey(key) | Self::Bearer { api_key: key, .. } => Self::Bearer {
                api_key: key.clone(),
                token,
            },
            Self::None => Self::None,
        }
    }

    /// Attach authentication headers to an HTTP request builder.
    ///
    /// - `ApiKey`: `apikey: <key>`
    /// - `Bearer`: `apikey: <key>` and `Authorization: Bearer <token>`
    /// - `None`: no headers
    pub fn apply_to_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        match self {
            Self::ApiKey(key) => Ok(request.header("apikey", key)),
            Self::Bearer { api_key, token } => {
                Ok(request.header("apikey", api_key).bearer_auth(token))
            },
            Self::None => Ok(request),
        }
    }

    /// Check if a user session token is present.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Bearer { .. })
    }
}
