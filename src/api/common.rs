use chrono::{DateTime, Utc};
use mongodb::{bson::doc, options::FindOptions};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    api::results::ElectionResults,
    common::election::ElectionId,
    db::{candidate::Candidate, election::Election, vote::VoteRecord},
    mongodb::Coll,
};
use crate::tally;

/// Look up an election by ID.
pub async fn election_by_id(
    election_id: ElectionId,
    elections: &Coll<Election>,
) -> Result<Election> {
    elections
        .find_one(doc! { "_id": election_id }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{election_id}'")))
}

/// All candidates standing in the given election, in election-defined
/// (insertion) order.
pub async fn candidates_for(
    election_id: ElectionId,
    candidates: &Coll<Candidate>,
) -> Result<Vec<Candidate>> {
    let in_creation_order = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    Ok(candidates
        .find(doc! { "election_id": election_id }, in_creation_order)
        .await?
        .try_collect()
        .await?)
}

/// Tally the given election's vote records. Both engines re-read current
/// state; nothing is cached between requests.
pub async fn results_for(
    election: Election,
    now: DateTime<Utc>,
    candidates: &Coll<Candidate>,
    records: &Coll<VoteRecord>,
) -> Result<ElectionResults> {
    let standing = candidates_for(election.id, candidates).await?;
    let cast: Vec<VoteRecord> = records
        .find(doc! { "election_id": election.id }, None)
        .await?
        .try_collect()
        .await?;

    let tallies = tally::tally(&standing, cast.iter().map(|record| record.candidate_id));
    let total_votes = tallies.iter().map(|t| t.votes).sum();

    Ok(ElectionResults {
        election_id: election.id,
        phase: election.phase(now),
        name: election.election.name,
        position: election.election.position,
        total_votes,
        candidates: tallies,
    })
}
