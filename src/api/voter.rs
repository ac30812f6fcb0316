use mongodb::{bson::doc, Client};
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::eligibility::{self, VoteDenial};
use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{AuthToken, Voter},
        election::Ballot,
    },
    common::{election::CandidateId, election::ElectionId, time},
    db::{
        candidate::Candidate,
        election::Election,
        vote::{NewVoteRecord, NewVoteStatus, VoteStatus},
    },
    mongodb::{Coll, Id},
};

use super::common::{candidates_for, election_by_id};

pub fn routes() -> Vec<Route> {
    routes![get_ballot, cast_vote]
}

#[get("/elections/<election_id>/ballot")]
async fn get_ballot(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    statuses: Coll<VoteStatus>,
) -> Result<Json<Ballot>> {
    let now = time::now();
    let election = election_by_id(election_id, &elections).await?;
    let standing = candidates_for(election_id, &candidates).await?;

    let voted = eligibility::has_voted(token.id, election_id, &statuses).await?;
    eligibility::check(&election, standing.len() as u64, voted, now).map_err(Error::Denied)?;

    Ok(Json(Ballot::new(election, standing)))
}

#[post("/elections/<election_id>/votes", data = "<vote>", format = "json")]
#[allow(clippy::too_many_arguments)]
async fn cast_vote(
    token: AuthToken<Voter>,
    election_id: ElectionId,
    vote: Json<VoteSpec>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    statuses: Coll<VoteStatus>,
    new_statuses: Coll<NewVoteStatus>,
    new_records: Coll<NewVoteRecord>,
    db_client: &State<Client>,
) -> Result<Json<CastReceipt>> {
    let now = time::now();
    let election = election_by_id(election_id, &elections).await?;

    // A candidate standing in a different election is as invalid as one
    // that does not exist at all.
    let candidate = candidates
        .find_one(
            doc! { "_id": vote.candidate, "election_id": election_id },
            None,
        )
        .await?
        .ok_or(Error::Denied(VoteDenial::InvalidCandidate))?;

    let vote_id = eligibility::cast_vote(
        token.id,
        &election,
        &candidate,
        now,
        db_client,
        &candidates,
        &statuses,
        &new_statuses,
        &new_records,
    )
    .await?;

    // The candidate is deliberately not logged.
    info!("user {} voted in election {}", token.id, election_id);
    Ok(Json(CastReceipt { vote_id }))
}

/// The voter's choice, as submitted.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct VoteSpec {
    pub candidate: CandidateId,
}

/// Acknowledgement that a vote was durably recorded.
#[derive(Debug, Serialize)]
struct CastReceipt {
    pub vote_id: Id,
}
