mod token;
mod user;

pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Admin, Privilege, Rights, Voter};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The longest institutional identifier we accept.
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Login or registration credentials.
#[derive(Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Reject malformed credentials before they reach the database.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::bad_request("username must not be empty"));
        }
        if self.username.len() > MAX_USERNAME_LENGTH {
            return Err(Error::bad_request(format!(
                "username must be at most {MAX_USERNAME_LENGTH} characters"
            )));
        }
        if self.password.is_empty() {
            return Err(Error::bad_request("password must not be empty"));
        }
        Ok(())
    }
}
