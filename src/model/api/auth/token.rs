use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite, Status},
    outcome::{try_outcome, IntoOutcome},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    db::user::User,
    mongodb::{Coll, Id},
};

use super::user::{Privilege, Rights};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token representing a signed-in user with specific
/// rights. The type parameter is the privilege a route demands; the token
/// itself is the same cookie either way.
#[derive(Serialize, Deserialize)]
pub struct AuthToken<P> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<P>,
}

impl<P> AuthToken<P> {
    /// Create a token for the given user, with rights derived from their
    /// administrator flag.
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            rights: if user.is_admin {
                Rights::Admin
            } else {
                Rights::Voter
            },
            phantom: PhantomData,
        }
    }

    /// Does this token permit acting at the given privilege level?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights >= target
    }

    /// Serialize this token into a signed session cookie.
    #[allow(clippy::missing_panics_doc)]
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Deserialize and verify a token from a session cookie.
    pub fn from_cookie(cookie: &Cookie<'static>, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            cookie.value(),
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<P>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Cookie claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<P> {
    #[serde(flatten, bound = "")]
    token: AuthToken<P>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, P> FromRequest<'r> for AuthToken<P>
where
    P: Privilege + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the session cookie and verify that the
    /// user it names still exists with sufficient rights. Routes that do
    /// not require this privilege level are forwarded to.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        // Forward to any routes that do not require an authentication token.
        let cookie = try_outcome!(req.cookies().get(AUTH_TOKEN_COOKIE).or_forward(()));

        // Decode the token.
        let token: Self = try_outcome!(Self::from_cookie(cookie, config).or_forward(()));

        // Cheap rights check against the claims.
        if !token.permits(P::RIGHTS) {
            return Outcome::Forward(());
        }

        // The user must still exist, with rights re-derived from the
        // database in case they changed since the token was issued.
        let db = req.guard::<&State<Database>>().await.unwrap();
        let user = Coll::<User>::from_db(db)
            .find_one(token.id.as_doc(), None)
            .await;
        match user {
            Ok(Some(user)) => {
                let current = if user.is_admin {
                    Rights::Admin
                } else {
                    Rights::Voter
                };
                if current >= P::RIGHTS {
                    Outcome::Success(token)
                } else {
                    Outcome::Forward(())
                }
            }
            Ok(None) => Outcome::Forward(()),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::api::auth::{Admin, Voter};

    #[test]
    fn cookie_round_trip() {
        let config = Config::example();
        let user = User::example_voter();
        let token: AuthToken<Voter> = AuthToken::for_user(&user);
        let id = token.id;

        let cookie = token.into_cookie(&config);
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));

        let decoded: AuthToken<Voter> = AuthToken::from_cookie(&cookie, &config).unwrap();
        assert_eq!(decoded.id, id);
        assert_eq!(decoded.rights, Rights::Voter);
    }

    #[test]
    fn tampered_cookie_is_rejected() {
        let config = Config::example();
        let user = User::example_voter();
        let token: AuthToken<Voter> = AuthToken::for_user(&user);

        let cookie = token.into_cookie(&config);
        let mut forged: Vec<char> = cookie.value().chars().collect();
        // Flip a character well inside the token.
        forged[10] = if forged[10] == 'x' { 'y' } else { 'x' };
        let forged = Cookie::new(AUTH_TOKEN_COOKIE, forged.into_iter().collect::<String>());

        assert!(AuthToken::<Voter>::from_cookie(&forged, &config).is_err());
    }

    #[test]
    fn voter_token_does_not_permit_admin() {
        let user = User::example_voter();
        let token: AuthToken<Voter> = AuthToken::for_user(&user);
        assert!(token.permits(Rights::Voter));
        assert!(!token.permits(Rights::Admin));
    }

    #[test]
    fn admin_token_permits_both_levels() {
        let mut user = User::example_voter();
        user.user.is_admin = true;
        let token: AuthToken<Admin> = AuthToken::for_user(&user);
        assert!(token.permits(Rights::Voter));
        assert!(token.permits(Rights::Admin));
    }
}
