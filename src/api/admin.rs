use std::collections::HashMap;

use mongodb::{bson::doc, options::FindOptions, Client};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        admin::{AdminStats, NewUserRequest, UserSummary},
        auth::{Admin, AuthToken},
        election::{
            CandidateDescription, CandidateSpec, ElectionDescription, ElectionSpec,
            ElectionSummary,
        },
    },
    common::{
        election::{CandidateId, ElectionId, ElectionPhase},
        time,
    },
    db::{
        candidate::{Candidate, CandidateCore},
        election::Election,
        user::{NewUser, User, UserCore},
        vote::{VoteRecord, VoteStatus},
    },
    mongodb::{
        errors::is_duplicate_key_error, Coll, Counter, Id, CANDIDATE_ID_COUNTER,
        ELECTION_ID_COUNTER,
    },
};

use super::common::{candidates_for, election_by_id};

pub fn routes() -> Vec<Route> {
    routes![
        stats,
        all_elections,
        create_election,
        modify_election,
        delete_election,
        create_candidate,
        delete_candidate,
        get_users,
        create_user,
    ]
}

#[get("/admin/stats")]
async fn stats(
    _token: AuthToken<Admin>,
    users: Coll<User>,
    elections: Coll<Election>,
    records: Coll<VoteRecord>,
) -> Result<Json<AdminStats>> {
    let now = time::now();
    let user_count = users.count_documents(None, None).await?;
    let election_count = elections.count_documents(None, None).await?;
    let vote_count = records.count_documents(None, None).await?;

    let active_elections = elections
        .find(doc! { "active": true }, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .filter(|election| election.phase(now) == ElectionPhase::Active)
        .map(|election| ElectionSummary::new(&election, now))
        .collect();

    Ok(Json(AdminStats {
        users: user_count,
        elections: election_count,
        votes: vote_count,
        active_elections,
    }))
}

/// Every election, including deactivated ones, newest first.
#[get("/admin/elections")]
async fn all_elections(
    _token: AuthToken<Admin>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionSummary>>> {
    let now = time::now();
    let newest_first = FindOptions::builder()
        .sort(doc! { "start_time": -1 })
        .build();
    let summaries = elections
        .find(None, newest_first)
        .await?
        .map_ok(|election| ElectionSummary::new(&election, now))
        .try_collect()
        .await?;
    Ok(Json(summaries))
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    _token: AuthToken<Admin>,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    counters: Coll<Counter>,
) -> Result<Json<ElectionDescription>> {
    let spec = spec.into_inner();
    spec.validate()?;

    let id = Counter::next_id(&counters, ELECTION_ID_COUNTER).await?;
    let election = spec.into_election(id);
    elections.insert_one(&election, None).await?;
    info!("Created election {id} '{}'", election.name);

    Ok(Json(ElectionDescription::new(election, Vec::new(), time::now())))
}

#[put("/elections/<election_id>", data = "<spec>", format = "json")]
async fn modify_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    spec: Json<ElectionSpec>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDescription>> {
    let spec = spec.into_inner();
    spec.validate()?;

    let updated = spec.into_election(election_id);
    let result = elections
        .replace_one(doc! { "_id": election_id }, &updated, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!(
            "Election with ID '{election_id}'"
        )));
    }

    let standing = candidates_for(election_id, &candidates).await?;
    Ok(Json(ElectionDescription::new(updated, standing, time::now())))
}

#[delete("/elections/<election_id>")]
async fn delete_election(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    records: Coll<VoteRecord>,
    statuses: Coll<VoteStatus>,
    db_client: &State<Client>,
) -> Result<()> {
    let election = election_by_id(election_id, &elections).await?;

    // Atomically delete the election and all associated data, dependents
    // first, so a partial failure can never leave orphaned rows.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let by_election = doc! { "election_id": election_id };
        records
            .delete_many_with_session(by_election.clone(), None, &mut session)
            .await?;
        statuses
            .delete_many_with_session(by_election.clone(), None, &mut session)
            .await?;
        candidates
            .delete_many_with_session(by_election, None, &mut session)
            .await?;
        elections
            .delete_one_with_session(doc! { "_id": election_id }, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    info!("Deleted election {election_id} '{}'", election.name);
    Ok(())
}

#[post("/elections/<election_id>/candidates", data = "<spec>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    spec: Json<CandidateSpec>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    counters: Coll<Counter>,
) -> Result<Json<CandidateDescription>> {
    let spec = spec.into_inner();
    spec.validate()?;

    // Candidates may only be created under an existing election.
    election_by_id(election_id, &elections).await?;

    let id = Counter::next_id(&counters, CANDIDATE_ID_COUNTER).await?;
    let candidate = Candidate {
        id,
        candidate: CandidateCore {
            election_id,
            name: spec.name,
        },
    };
    candidates.insert_one(&candidate, None).await?;

    Ok(Json(candidate.into()))
}

#[delete("/elections/<election_id>/candidates/<candidate_id>")]
async fn delete_candidate(
    _token: AuthToken<Admin>,
    election_id: ElectionId,
    candidate_id: CandidateId,
    candidates: Coll<Candidate>,
    records: Coll<VoteRecord>,
) -> Result<()> {
    // Vote records reference candidates by ID; removing one after voting
    // has begun would corrupt the tally.
    let votes = records
        .count_documents(doc! { "election_id": election_id }, None)
        .await?;
    if votes > 0 {
        return Err(Error::bad_request(
            "cannot remove a candidate after votes have been cast",
        ));
    }

    let result = candidates
        .delete_one(
            doc! { "_id": candidate_id, "election_id": election_id },
            None,
        )
        .await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!(
            "Candidate with ID '{candidate_id}'"
        )));
    }
    Ok(())
}

/// Every user with how many elections they have voted in, for the
/// electoral-roll view.
#[get("/admin/users")]
async fn get_users(
    _token: AuthToken<Admin>,
    users: Coll<User>,
    statuses: Coll<VoteStatus>,
) -> Result<Json<Vec<UserSummary>>> {
    let by_username = FindOptions::builder().sort(doc! { "username": 1 }).build();
    let user_list: Vec<User> = users.find(None, by_username).await?.try_collect().await?;

    let mut counts: HashMap<Id, u64> = HashMap::new();
    let mut cursor = statuses.find(None, None).await?;
    while let Some(status) = cursor.try_next().await? {
        *counts.entry(status.user_id).or_default() += 1;
    }

    let summaries = user_list
        .into_iter()
        .map(|User { id, user }| UserSummary {
            username: user.username,
            is_admin: user.is_admin,
            votes_cast: counts.get(&id).copied().unwrap_or(0),
        })
        .collect();
    Ok(Json(summaries))
}

#[post("/admin/users", data = "<request>", format = "json")]
async fn create_user(
    _token: AuthToken<Admin>,
    request: Json<NewUserRequest>,
    users: Coll<User>,
    new_users: Coll<NewUser>,
) -> Result<()> {
    let request = request.into_inner();
    request.validate()?;

    let taken = users
        .find_one(doc! { "username": &request.username }, None)
        .await?
        .is_some();
    if taken {
        return Err(Error::bad_request(format!(
            "Username already in use: {}",
            request.username
        )));
    }

    let user = UserCore::new(request.username, &request.password, request.is_admin)?;
    match new_users.insert_one(user, None).await {
        Ok(_) => Ok(()),
        Err(err) if is_duplicate_key_error(&err) => {
            Err(Error::bad_request("Username already in use"))
        }
        Err(err) => Err(err.into()),
    }
}
