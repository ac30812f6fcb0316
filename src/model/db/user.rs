use std::ops::{Deref, DerefMut};

use mongodb::bson::doc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::mongodb::{Coll, Id};

/// Username of the administrator account created on first launch.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Core user data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    /// Institutional identifier, e.g. a college ID. Immutable once created.
    pub username: String,
    /// Argon2-encoded password hash. Never leaves the model layer.
    pub password_hash: String,
    /// Administrator flag.
    pub is_admin: bool,
}

impl UserCore {
    /// Create a new user, hashing the given password with a random salt.
    pub fn new(username: String, password: &str, is_admin: bool) -> Result<Self> {
        let salt: [u8; 16] = rand::thread_rng().gen();
        let password_hash =
            argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())?;
        Ok(Self {
            username,
            password_hash,
            is_admin,
        })
    }

    /// Check whether the given password is correct.
    ///
    /// Hashes are only ever produced by [`UserCore::new`], so a hash that
    /// fails to decode counts as a mismatch rather than an error.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user without an ID, ready for insertion.
pub type NewUser = UserCore;

/// A user from the database, with their unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Ensure that at least one administrator account exists, creating the
/// default one with the configured password if there is none.
///
/// This operation is idempotent.
pub async fn ensure_admin_exists(users: &Coll<NewUser>, password: &str) -> Result<()> {
    let existing = users.find_one(doc! { "is_admin": true }, None).await?;
    if existing.is_none() {
        let admin = UserCore::new(DEFAULT_ADMIN_USERNAME.to_string(), password, true)?;
        users.insert_one(admin, None).await?;
        info!("Created default administrator '{DEFAULT_ADMIN_USERNAME}'");
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl UserCore {
        pub fn example_voter() -> Self {
            Self::new("u1700042".to_string(), "correct horse battery", false)
                .expect("hashing example credentials")
        }

        pub fn example_admin() -> Self {
            Self::new("returning-officer".to_string(), "tally-ho!", true)
                .expect("hashing example credentials")
        }
    }

    impl User {
        pub fn example_voter() -> Self {
            Self {
                id: Id::new(),
                user: UserCore::example_voter(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_verification() {
        let user = UserCore::new("u1700042".to_string(), "hunter2", false).unwrap();
        assert!(user.verify_password("hunter2"));
        assert!(!user.verify_password("hunter3"));
        assert!(!user.verify_password(""));
    }

    #[test]
    fn example_accounts() {
        assert!(!UserCore::example_voter().is_admin);
        assert!(UserCore::example_admin().is_admin);
    }

    #[test]
    fn hashes_are_salted() {
        let a = UserCore::new("a".to_string(), "same password", false).unwrap();
        let b = UserCore::new("b".to_string(), "same password", false).unwrap();
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn plaintext_never_stored() {
        let user = UserCore::new("u1700042".to_string(), "hunter2", false).unwrap();
        assert!(!user.password_hash.contains("hunter2"));
    }
}
