use std::collections::HashSet;

use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        auth::{Admin, AuthToken, Voter},
        election::{Dashboard, ElectionDescription},
        results::ElectionResults,
    },
    common::{election::ElectionId, time},
    db::{candidate::Candidate, election::Election, vote::VoteRecord, vote::VoteStatus},
    mongodb::Coll,
};
use crate::tally::results_visible;

use super::common::{candidates_for, election_by_id, results_for};

pub fn routes() -> Vec<Route> {
    routes![
        dashboard,
        dashboard_anonymous,
        election_detail,
        results_admin,
        results_public,
    ]
}

#[get("/elections", rank = 1)]
async fn dashboard(
    token: AuthToken<Voter>,
    elections: Coll<Election>,
    statuses: Coll<VoteStatus>,
) -> Result<Json<Dashboard>> {
    let now = time::now();
    let all: Vec<Election> = elections.find(None, None).await?.try_collect().await?;

    // Which elections has this user already voted in?
    let voted: HashSet<ElectionId> = statuses
        .find(doc! { "user_id": *token.id }, None)
        .await?
        .map_ok(|status| status.election_id)
        .try_collect()
        .await?;

    Ok(Json(Dashboard::partition(all, &voted, now)))
}

#[get("/elections", rank = 2)]
async fn dashboard_anonymous(elections: Coll<Election>) -> Result<Json<Dashboard>> {
    let now = time::now();
    let all: Vec<Election> = elections.find(None, None).await?.try_collect().await?;
    Ok(Json(Dashboard::partition_anonymous(all, now)))
}

#[get("/elections/<election_id>")]
async fn election_detail(
    election_id: ElectionId,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDescription>> {
    let now = time::now();
    let election = election_by_id(election_id, &elections).await?;
    let standing = candidates_for(election_id, &candidates).await?;
    Ok(Json(ElectionDescription::new(election, standing, now)))
}

#[get("/elections/<election_id>/results", rank = 1)]
async fn results_admin(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    records: Coll<VoteRecord>,
) -> Result<Json<ElectionResults>> {
    let now = time::now();
    let election = election_by_id(election_id, &elections).await?;
    Ok(Json(results_for(election, now, &candidates, &records).await?))
}

#[get("/elections/<election_id>/results", rank = 2)]
async fn results_public(
    election_id: ElectionId,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    records: Coll<VoteRecord>,
) -> Result<Json<ElectionResults>> {
    let now = time::now();
    let election = election_by_id(election_id, &elections).await?;

    if !results_visible(election.phase(now), false) {
        return Err(Error::bad_request(
            "results are not available until the election has closed",
        ));
    }

    Ok(Json(results_for(election, now, &candidates, &records).await?))
}
