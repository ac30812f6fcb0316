//! API-compatible types: what requests deserialize from and responses
//! serialize to. Datetimes here are plain RFC 3339, unlike the DB types.

pub mod admin;
pub mod auth;
pub mod election;
pub mod results;
