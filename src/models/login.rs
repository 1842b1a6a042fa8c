use serde::{Deserialize, Serialize};

use super::user_profile::UserProfile;

/// Credentials for the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,

    /// Account password.
    pub password: String,
}

/// Successful login response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Session token for subsequent requests.
    pub access_token: String,

    /// The signed-in user's profile.
    pub user: UserProfile,
}
