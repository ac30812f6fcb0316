use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::common::election::{CandidateId, ElectionId};
use crate::model::mongodb::Id;

/// A recorded choice: what was voted for, deliberately not by whom.
///
/// Append-only; rows are only ever removed by the election-deletion cascade.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VoteRecordCore {
    /// The election the vote was cast in.
    pub election_id: ElectionId,
    /// The chosen candidate.
    pub candidate_id: CandidateId,
    /// When the vote was cast.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

/// A vote record without an ID, ready for insertion.
pub type NewVoteRecord = VoteRecordCore;

/// A vote record from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub record: VoteRecordCore,
}

impl Deref for VoteRecord {
    type Target = VoteRecordCore;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

/// An eligibility-ledger row: user X has voted in election Y.
///
/// The `(user_id, election_id)` pair carries a unique index, which is the
/// mechanism that holds the one-vote-per-election invariant. Kept separate
/// from [`VoteRecord`] so the ledger never learns what was voted for.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct VoteStatusCore {
    /// The voting user.
    pub user_id: Id,
    /// The election voted in.
    pub election_id: ElectionId,
    /// When the vote was cast.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

/// A vote status without an ID, ready for insertion.
pub type NewVoteStatus = VoteStatusCore;

/// A vote status from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteStatus {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub status: VoteStatusCore,
}

impl Deref for VoteStatus {
    type Target = VoteStatusCore;

    fn deref(&self) -> &Self::Target {
        &self.status
    }
}
