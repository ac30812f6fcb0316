use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// Counter for assigning election IDs.
pub const ELECTION_ID_COUNTER: &str = "election_id";
/// Counter for assigning candidate IDs.
pub const CANDIDATE_ID_COUNTER: &str = "candidate_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u64,
}

impl Counter {
    /// Atomically retrieve the next value of the named counter.
    pub async fn next(counters: &Coll<Counter>, name: &str) -> Result<u64> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update(doc! { "_id": name }, update, options)
            .await?
            .ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    format!("Failed to find counter '{}'", name),
                )
            })?;
        Ok(counter.next)
    }

    /// [`Counter::next`], narrowed to the `u32` ID space our elections and
    /// candidates use.
    pub async fn next_id(counters: &Coll<Counter>, name: &str) -> Result<u32> {
        let next = Self::next(counters, name).await?;
        u32::try_from(next).map_err(|_| {
            Error::Status(
                Status::InternalServerError,
                format!("Counter '{}' exhausted", name),
            )
        })
    }
}

/// Ensure that both ID counters exist, starting at 1.
///
/// This operation is idempotent.
pub async fn ensure_counters_exist(counters: &Coll<Counter>) -> std::result::Result<(), DbError> {
    let upsert = UpdateOptions::builder().upsert(true).build();
    for name in [ELECTION_ID_COUNTER, CANDIDATE_ID_COUNTER] {
        counters
            .update_one(
                doc! { "_id": name },
                doc! { "$setOnInsert": { "next": 1_i64 } },
                upsert.clone(),
            )
            .await?;
    }
    Ok(())
}
