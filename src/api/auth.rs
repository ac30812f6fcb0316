use mongodb::bson::doc;
use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        api::auth::{AuthToken, Credentials, Rights, Voter, AUTH_TOKEN_COOKIE},
        db::user::{NewUser, User, UserCore},
        mongodb::{errors::is_duplicate_key_error, Coll},
    },
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

#[post("/auth/register", data = "<credentials>", format = "json")]
async fn register(
    credentials: Json<Credentials>,
    users: Coll<User>,
    new_users: Coll<NewUser>,
) -> Result<()> {
    let credentials = credentials.into_inner();
    credentials.validate()?;

    // Friendly pre-check; the unique index on `username` is the real gate.
    let taken = users
        .find_one(doc! { "username": &credentials.username }, None)
        .await?
        .is_some();
    if taken {
        return Err(Error::bad_request(format!(
            "Username already in use: {}",
            credentials.username
        )));
    }

    let user = UserCore::new(credentials.username, &credentials.password, false)?;
    match new_users.insert_one(user, None).await {
        Ok(_) => Ok(()),
        // Lost a registration race for the same username.
        Err(err) if is_duplicate_key_error(&err) => {
            Err(Error::bad_request("Username already in use"))
        }
        Err(err) => Err(err.into()),
    }
}

#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<Rights>> {
    let user = users
        .find_one(doc! { "username": &credentials.username }, None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| {
            Error::unauthorized(
                "No user found with the provided username and password combination.",
            )
        })?;

    let token: AuthToken<Voter> = AuthToken::for_user(&user);
    let rights = token.rights;
    cookies.add(token.into_cookie(config));

    Ok(Json(rights))
}

#[delete("/auth")]
fn logout(cookies: &CookieJar) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}
