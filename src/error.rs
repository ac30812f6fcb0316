use std::io::Cursor;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{ContentType, Status, StatusClass},
    response::Responder,
    serde::json::serde_json::json,
    Response,
};
use thiserror::Error;

use crate::eligibility::VoteDenial;
use crate::logging::RequestId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    PasswordHash(#[from] argon2::Error),
    /// An eligibility check failed; the reason is user-facing.
    #[error("Vote denied: {0}")]
    Denied(VoteDenial),
    /// The persistence layer is reachable but could not complete the
    /// operation right now; safe to retry.
    #[error("Temporarily unavailable: {0}")]
    Unavailable(String),
    /// Any other failure with a fixed status and user-facing message.
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, format!("{} not found", what.into()))
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, msg.into())
    }

    fn status(&self) -> Status {
        match self {
            Self::Db(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::PasswordHash(_) => Status::BadRequest,
            Self::Denied(VoteDenial::InvalidCandidate) => Status::UnprocessableEntity,
            Self::Denied(_) => Status::Conflict,
            Self::Unavailable(_) => Status::ServiceUnavailable,
            Self::Status(status, _) => *status,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let id = req.local_cache(RequestId::next);
        let status = self.status();
        let log_msg = format!("rsp{id} {status}: {self}");
        match status.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            _ => warn!("{log_msg}"),
        }

        // Never leak internals; the body carries only the user-facing message.
        let message = match &self {
            Self::Db(_) => "internal error".to_string(),
            Self::Jwt(_) => "invalid session".to_string(),
            other => other.to_string(),
        };
        let body = json!({ "error": message }).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
