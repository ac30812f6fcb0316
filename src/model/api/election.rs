use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{
        election::{CandidateId, ElectionId, ElectionPhase},
        time,
    },
    db::{
        candidate::Candidate,
        election::{Election, ElectionCore},
    },
};

/// How many finished elections the dashboard shows.
const FINISHED_LIMIT: usize = 5;

/// An election specification, as submitted by an administrator.
#[derive(Debug, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// Election name.
    pub name: String,
    /// The position being contested.
    pub position: String,
    /// Start of the voting window.
    pub start_time: DateTime<Utc>,
    /// End of the voting window.
    pub end_time: DateTime<Utc>,
    /// Whether the election is live on creation. Defaults to live.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ElectionSpec {
    /// Reject malformed specifications: empty labels or an inverted window.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::bad_request("election name must not be empty"));
        }
        if self.position.trim().is_empty() {
            return Err(Error::bad_request("position must not be empty"));
        }
        if time::normalize(self.end_time) <= time::normalize(self.start_time) {
            return Err(Error::bad_request(
                "end time must be strictly after start time",
            ));
        }
        Ok(())
    }

    /// Convert this spec into an election with the given unique ID,
    /// normalizing its window to canonical form.
    pub fn into_election(self, id: ElectionId) -> Election {
        Election {
            id,
            election: ElectionCore {
                name: self.name,
                position: self.position,
                start_time: time::normalize(self.start_time),
                end_time: time::normalize(self.end_time),
                active: self.active,
            },
        }
    }
}

/// A candidate specification, as submitted by an administrator.
#[derive(Debug, Serialize, Deserialize)]
pub struct CandidateSpec {
    /// Candidate name.
    pub name: String,
}

impl CandidateSpec {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::bad_request("candidate name must not be empty"));
        }
        Ok(())
    }
}

/// A candidate as shown to voters.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: CandidateId,
    pub name: String,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.candidate.name,
        }
    }
}

/// A full election view, including its computed phase and candidates.
#[derive(Debug, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ElectionId,
    pub name: String,
    pub position: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub active: bool,
    pub phase: ElectionPhase,
    pub candidates: Vec<CandidateDescription>,
}

impl ElectionDescription {
    pub fn new(election: Election, candidates: Vec<Candidate>, now: DateTime<Utc>) -> Self {
        let phase = election.phase(now);
        Self {
            id: election.id,
            name: election.election.name,
            position: election.election.position,
            start_time: election.election.start_time,
            end_time: election.election.end_time,
            active: election.election.active,
            phase,
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

/// A one-line election summary for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSummary {
    pub id: ElectionId,
    pub name: String,
    pub position: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub phase: ElectionPhase,
}

impl ElectionSummary {
    pub fn new(election: &Election, now: DateTime<Utc>) -> Self {
        Self {
            id: election.id,
            name: election.name.clone(),
            position: election.position.clone(),
            start_time: election.start_time,
            end_time: election.end_time,
            phase: election.phase(now),
        }
    }
}

/// The ballot presented to an eligible voter.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ballot {
    pub election_id: ElectionId,
    pub name: String,
    pub position: String,
    /// When the ballot stops being accepted.
    pub end_time: DateTime<Utc>,
    pub candidates: Vec<CandidateDescription>,
}

impl Ballot {
    pub fn new(election: Election, candidates: Vec<Candidate>) -> Self {
        Self {
            election_id: election.id,
            name: election.election.name,
            position: election.election.position,
            end_time: election.election.end_time,
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }
}

/// The voter-facing dashboard: every election, partitioned by what the
/// requester can do with it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    /// Active elections the requester may still vote in.
    pub available: Vec<ElectionSummary>,
    /// Elections the requester has voted in, whatever their phase.
    pub voted: Vec<ElectionSummary>,
    /// Active-flagged elections whose window has not opened yet.
    pub upcoming: Vec<ElectionSummary>,
    /// The most recently finished elections.
    pub finished: Vec<ElectionSummary>,
}

impl Dashboard {
    /// Partition elections for a signed-in voter. `voted` holds the IDs of
    /// elections the requester has an eligibility-ledger row for.
    pub fn partition(
        elections: Vec<Election>,
        voted: &HashSet<ElectionId>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut dashboard = Self {
            available: Vec::new(),
            voted: Vec::new(),
            upcoming: Vec::new(),
            finished: Vec::new(),
        };

        for election in &elections {
            let summary = ElectionSummary::new(election, now);
            if voted.contains(&election.id) {
                dashboard.voted.push(summary.clone());
            }
            match summary.phase {
                ElectionPhase::Active => {
                    if !voted.contains(&election.id) {
                        dashboard.available.push(summary);
                    }
                }
                ElectionPhase::Upcoming => dashboard.upcoming.push(summary),
                ElectionPhase::Closed => dashboard.finished.push(summary),
            }
        }

        dashboard.upcoming.sort_by_key(|e| e.start_time);
        dashboard
            .finished
            .sort_by(|a, b| b.end_time.cmp(&a.end_time));
        dashboard.finished.truncate(FINISHED_LIMIT);
        dashboard
    }

    /// Partition elections for an anonymous requester: nothing is available
    /// or voted, but the public lists are still shown.
    pub fn partition_anonymous(elections: Vec<Election>, now: DateTime<Utc>) -> Self {
        let mut dashboard = Self::partition(elections, &HashSet::new(), now);
        dashboard.available.clear();
        dashboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    fn spec() -> ElectionSpec {
        ElectionSpec {
            name: "Student Union Election".to_string(),
            position: "President".to_string(),
            start_time: time::now(),
            end_time: time::now() + Duration::days(1),
            active: true,
        }
    }

    #[test]
    fn valid_spec_passes() {
        assert!(spec().validate().is_ok());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut inverted = spec();
        inverted.end_time = inverted.start_time - Duration::hours(1);
        assert!(inverted.validate().is_err());

        // A degenerate (empty) window is equally invalid.
        let mut degenerate = spec();
        degenerate.end_time = degenerate.start_time;
        assert!(degenerate.validate().is_err());
    }

    #[test]
    fn empty_labels_are_rejected() {
        let mut unnamed = spec();
        unnamed.name = " ".to_string();
        assert!(unnamed.validate().is_err());

        let mut positionless = spec();
        positionless.position.clear();
        assert!(positionless.validate().is_err());
    }

    #[test]
    fn into_election_normalizes_the_window() {
        let mut spec = spec();
        spec.start_time = spec.start_time + Duration::nanoseconds(999);
        let election = spec.into_election(3);
        assert_eq!(election.id, 3);
        assert_eq!(
            election.start_time,
            time::normalize(election.start_time)
        );
    }

    #[test]
    fn dashboard_partition() {
        let now = time::now();
        let make = |id: ElectionId, start: DateTime<Utc>, end: DateTime<Utc>, active| Election {
            id,
            election: ElectionCore {
                name: format!("Election {id}"),
                position: "Chair".to_string(),
                start_time: start,
                end_time: end,
                active,
            },
        };

        let elections = vec![
            // Active, not voted: available.
            make(1, now - Duration::hours(1), now + Duration::hours(1), true),
            // Active, voted.
            make(2, now - Duration::hours(1), now + Duration::hours(1), true),
            // Upcoming.
            make(3, now + Duration::days(2), now + Duration::days(3), true),
            // Finished.
            make(4, now - Duration::days(3), now - Duration::days(2), true),
            // Deactivated counts as finished.
            make(5, now - Duration::hours(1), now + Duration::hours(1), false),
        ];
        let voted = HashSet::from([2]);

        let dashboard = Dashboard::partition(elections, &voted, now);

        let ids = |list: &[ElectionSummary]| list.iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(&dashboard.available), vec![1]);
        assert_eq!(ids(&dashboard.voted), vec![2]);
        assert_eq!(ids(&dashboard.upcoming), vec![3]);
        // Finished is newest-first: the deactivated election's window ends
        // after election 4's.
        assert_eq!(ids(&dashboard.finished), vec![5, 4]);
    }

    #[test]
    fn finished_list_is_capped() {
        let now = time::now();
        let elections = (1u32..=10)
            .map(|id| Election {
                id,
                election: ElectionCore {
                    name: format!("Election {id}"),
                    position: "Chair".to_string(),
                    start_time: now - Duration::days(2 + i64::from(id)),
                    end_time: now - Duration::days(1 + i64::from(id)),
                    active: true,
                },
            })
            .collect();

        let dashboard = Dashboard::partition_anonymous(elections, now);
        assert_eq!(dashboard.finished.len(), FINISHED_LIMIT);
        // Newest first.
        assert_eq!(dashboard.finished[0].id, 1);
    }

    #[test]
    fn anonymous_dashboard_hides_personal_lists() {
        let now = time::now();
        let elections = vec![Election::example_current()];
        let dashboard = Dashboard::partition_anonymous(elections, now);
        assert!(dashboard.available.is_empty());
        assert!(dashboard.voted.is_empty());
    }
}
