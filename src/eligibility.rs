//! The vote-eligibility engine: the single source of truth for whether a
//! user may vote in a given election at a given instant, and for performing
//! the vote transition itself.
//!
//! All decisions re-read current state; nothing here is cached between
//! requests. Cross-request mutual exclusion is delegated entirely to the
//! database's unique index on `(user_id, election_id)`.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use mongodb::{bson::doc, error::Error as DbError, Client, ClientSession};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{
    common::election::{ElectionId, ElectionPhase},
    db::{
        candidate::Candidate,
        election::{Election, ElectionCore},
        vote::{NewVoteRecord, NewVoteStatus, VoteStatus},
    },
    mongodb::{
        errors::{is_duplicate_key_error, is_transient_error},
        Coll, Id,
    },
};

/// Compute where an election sits in its lifecycle at `now`.
///
/// The three phases are mutually exclusive and exhaustive for a well-formed
/// election (end strictly after start): deactivated or expired elections are
/// `Closed`, an election whose window contains `now` is `Active`, and an
/// active election whose window has yet to open is `Upcoming`.
pub fn classify(election: &ElectionCore, now: DateTime<Utc>) -> ElectionPhase {
    if !election.active || election.end_time < now {
        ElectionPhase::Closed
    } else if election.start_time <= now {
        // active, start_time <= now <= end_time
        ElectionPhase::Active
    } else {
        ElectionPhase::Upcoming
    }
}

/// Why a vote may not be cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDenial {
    /// The election is upcoming, closed, or deactivated.
    NotActive,
    /// The election has no candidates to choose between.
    NoCandidates,
    /// An eligibility-ledger row already exists for this user and election.
    AlreadyVoted,
    /// The chosen candidate does not stand in this election.
    InvalidCandidate,
}

impl Display for VoteDenial {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotActive => "this election is not currently open for voting",
            Self::NoCandidates => "this election has no candidates",
            Self::AlreadyVoted => "you have already voted in this election",
            Self::InvalidCandidate => "the chosen candidate does not stand in this election",
        };
        write!(f, "{reason}")
    }
}

/// Decide whether a vote may be cast, given a snapshot of the world.
///
/// Denial reasons are checked in a fixed order; the first failure wins.
pub fn check(
    election: &ElectionCore,
    candidate_count: u64,
    has_voted: bool,
    now: DateTime<Utc>,
) -> std::result::Result<(), VoteDenial> {
    if classify(election, now) != ElectionPhase::Active {
        Err(VoteDenial::NotActive)
    } else if candidate_count == 0 {
        Err(VoteDenial::NoCandidates)
    } else if has_voted {
        Err(VoteDenial::AlreadyVoted)
    } else {
        Ok(())
    }
}

/// Look up whether the user already holds an eligibility-ledger row for the
/// given election.
pub async fn has_voted(
    user_id: Id,
    election_id: ElectionId,
    statuses: &Coll<VoteStatus>,
) -> Result<bool> {
    let filter = doc! {
        "user_id": *user_id,
        "election_id": election_id,
    };
    Ok(statuses.find_one(filter, None).await?.is_some())
}

/// Cast the user's vote for `candidate` in `election`.
///
/// Re-validates eligibility against current state, then writes the vote
/// record and the eligibility-ledger row as a single transaction. The
/// unique index on `(user_id, election_id)` is what holds the one-vote
/// invariant under concurrent submissions: of N racing casts for the same
/// user and election, exactly one commits and the rest observe a
/// duplicate-key violation, reported here as [`VoteDenial::AlreadyVoted`].
///
/// On success returns the new vote record's ID. On any failure neither row
/// is left behind.
#[allow(clippy::too_many_arguments)]
pub async fn cast_vote(
    user_id: Id,
    election: &Election,
    candidate: &Candidate,
    now: DateTime<Utc>,
    client: &Client,
    candidates: &Coll<Candidate>,
    statuses: &Coll<VoteStatus>,
    new_statuses: &Coll<NewVoteStatus>,
    new_records: &Coll<NewVoteRecord>,
) -> Result<Id> {
    if candidate.election_id != election.id {
        return Err(Error::Denied(VoteDenial::InvalidCandidate));
    }

    let candidate_count = candidates
        .count_documents(doc! { "election_id": election.id }, None)
        .await?;
    let voted = has_voted(user_id, election.id, statuses).await?;
    check(election, candidate_count, voted, now).map_err(Error::Denied)?;

    let record = NewVoteRecord {
        election_id: election.id,
        candidate_id: candidate.id,
        cast_at: now,
    };
    let status = NewVoteStatus {
        user_id,
        election_id: election.id,
        cast_at: now,
    };

    let mut session = client.start_session(None).await?;
    session.start_transaction(None).await?;
    let record_id = match insert_vote(&mut session, new_statuses, new_records, status, record).await
    {
        Ok(id) => id,
        Err(err) => {
            // Roll back before reporting; no partial state may remain.
            let _ = session.abort_transaction().await;
            return Err(translate_vote_error(err));
        }
    };
    if let Err(err) = session.commit_transaction().await {
        return Err(translate_vote_error(err));
    }
    Ok(record_id)
}

/// Both halves of the vote, inside the caller's transaction.
async fn insert_vote(
    session: &mut ClientSession,
    new_statuses: &Coll<NewVoteStatus>,
    new_records: &Coll<NewVoteRecord>,
    status: NewVoteStatus,
    record: NewVoteRecord,
) -> std::result::Result<Id, DbError> {
    // Ledger row first: its unique index is the contended write, so a racing
    // double vote fails before any tally data is produced.
    new_statuses
        .insert_one_with_session(status, None, session)
        .await?;
    let inserted = new_records
        .insert_one_with_session(record, None, session)
        .await?;
    Ok(inserted
        .inserted_id
        .as_object_id()
        .unwrap() // Valid because the ID comes directly from the DB.
        .into())
}

/// Map a storage failure during the vote transaction onto the error
/// taxonomy: a duplicate key means somebody (possibly a racing request for
/// the same user) voted first, and transient transaction failures are
/// retryable. Anything else is a genuine storage error.
fn translate_vote_error(err: DbError) -> Error {
    if is_duplicate_key_error(&err) {
        Error::Denied(VoteDenial::AlreadyVoted)
    } else if is_transient_error(&err) {
        Error::Unavailable("your vote was not recorded; please try again".to_string())
    } else {
        Error::Db(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone};

    use crate::model::common::time;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        (start, end)
    }

    fn election(active: bool) -> ElectionCore {
        let (start_time, end_time) = window();
        ElectionCore {
            name: "Student Union Election".to_string(),
            position: "President".to_string(),
            start_time,
            end_time,
            active,
        }
    }

    #[test]
    fn classify_within_window() {
        let (start, end) = window();
        let midday = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert_eq!(classify(&election(true), midday), ElectionPhase::Active);
        // Window endpoints are inclusive.
        assert_eq!(classify(&election(true), start), ElectionPhase::Active);
        assert_eq!(classify(&election(true), end), ElectionPhase::Active);
    }

    #[test]
    fn classify_outside_window() {
        let (start, end) = window();

        let before = start - Duration::seconds(1);
        assert_eq!(classify(&election(true), before), ElectionPhase::Upcoming);

        let after = end + Duration::seconds(1);
        assert_eq!(classify(&election(true), after), ElectionPhase::Closed);
    }

    #[test]
    fn deactivated_election_is_closed() {
        let midday = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(classify(&election(false), midday), ElectionPhase::Closed);
    }

    /// Exactly one phase holds at every instant.
    #[test]
    fn classification_partitions_time() {
        let (start, end) = window();
        let instants = [
            start - Duration::days(1),
            start - Duration::milliseconds(1),
            start,
            start + Duration::hours(12),
            end - Duration::milliseconds(1),
            end,
            end + Duration::milliseconds(1),
            end + Duration::days(365),
        ];
        for active in [true, false] {
            let election = election(active);
            for now in instants {
                let phase = classify(&election, now);
                let matches = [
                    phase == ElectionPhase::Upcoming,
                    phase == ElectionPhase::Active,
                    phase == ElectionPhase::Closed,
                ];
                assert_eq!(matches.iter().filter(|m| **m).count(), 1);
            }
        }
    }

    #[test]
    fn denial_order_is_fixed() {
        let (start, _) = window();
        let midday = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        // An inactive election with no candidates and a prior vote reports
        // NotActive: the phase check comes first.
        assert_eq!(
            check(&election(false), 0, true, midday),
            Err(VoteDenial::NotActive)
        );
        // Upcoming is equally NotActive.
        assert_eq!(
            check(&election(true), 2, false, start - Duration::hours(1)),
            Err(VoteDenial::NotActive)
        );
        // Active, but nothing to vote for.
        assert_eq!(
            check(&election(true), 0, true, midday),
            Err(VoteDenial::NoCandidates)
        );
        // Active with candidates, but the ledger already has a row.
        assert_eq!(
            check(&election(true), 2, true, midday),
            Err(VoteDenial::AlreadyVoted)
        );
        // Otherwise allowed.
        assert_eq!(check(&election(true), 2, false, midday), Ok(()));
    }

    #[test]
    fn check_uses_normalized_instants() {
        // A sub-millisecond instant inside the window still classifies
        // Active after normalization.
        let instant = time::normalize(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::nanoseconds(999),
        );
        assert_eq!(check(&election(true), 1, false, instant), Ok(()));
    }
}
