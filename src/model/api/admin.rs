use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::api::auth::Credentials;
use crate::model::api::election::ElectionSummary;

/// An account-creation request from an administrator, e.g. when
/// pre-registering the electoral roll.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl NewUserRequest {
    pub fn validate(&self) -> Result<()> {
        // Same rules as self-registration.
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
        .validate()
    }
}

/// A user as listed to administrators. Deliberately omits the password
/// hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub is_admin: bool,
    /// How many elections this user has voted in.
    pub votes_cast: u64,
}

/// Headline numbers for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub users: u64,
    pub elections: u64,
    pub votes: u64,
    /// Elections that are open for voting right now.
    pub active_elections: Vec<ElectionSummary>,
}
