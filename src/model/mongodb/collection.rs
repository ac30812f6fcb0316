use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    candidate::Candidate,
    election::Election,
    user::{User, UserCore},
    vote::{VoteRecord, VoteRecordCore, VoteStatus, VoteStatusCore},
};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// User collection.
const USERS: &str = "users";
impl MongoCollection for User {
    const NAME: &'static str = USERS;
}
impl MongoCollection for UserCore {
    const NAME: &'static str = USERS;
}

// Election collection.
const ELECTIONS: &str = "elections";
impl MongoCollection for Election {
    const NAME: &'static str = ELECTIONS;
}

// Candidate collection.
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}

// Vote record collection: what was voted for, never by whom.
const VOTE_RECORDS: &str = "vote_records";
impl MongoCollection for VoteRecord {
    const NAME: &'static str = VOTE_RECORDS;
}
impl MongoCollection for VoteRecordCore {
    const NAME: &'static str = VOTE_RECORDS;
}

// Vote status collection: the eligibility ledger of who voted where.
const VOTE_STATUS: &str = "vote_status";
impl MongoCollection for VoteStatus {
    const NAME: &'static str = VOTE_STATUS;
}
impl MongoCollection for VoteStatusCore {
    const NAME: &'static str = VOTE_STATUS;
}

// Counter collection.
const COUNTERS: &str = "counters";
impl MongoCollection for Counter {
    const NAME: &'static str = COUNTERS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection: institutional identifiers are unique.
    let user_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db).create_index(user_index, None).await?;

    // Vote status collection: at most one ledger row per (user, election).
    // This index is what makes a double vote impossible under racing requests.
    let status_index = IndexModel::builder()
        .keys(doc! {"user_id": 1, "election_id": 1})
        .options(unique)
        .build();
    Coll::<VoteStatus>::from_db(db)
        .create_index(status_index, None)
        .await?;

    // Candidate collection, queried by owning election.
    let candidate_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .build();
    Coll::<Candidate>::from_db(db)
        .create_index(candidate_index, None)
        .await?;

    // Vote record collection, queried by election at tally time.
    let record_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .build();
    Coll::<VoteRecord>::from_db(db)
        .create_index(record_index, None)
        .await?;

    Ok(())
}
