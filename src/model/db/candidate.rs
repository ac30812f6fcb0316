use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::common::election::{CandidateId, ElectionId};

/// Core candidate data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct CandidateCore {
    /// The election this candidate stands in. Candidates belong to exactly
    /// one election and are deleted with it.
    pub election_id: ElectionId,
    /// Candidate name.
    pub name: String,
}

/// A candidate from the database, with their unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: CandidateId,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Candidate {
        pub fn example(id: CandidateId, election_id: ElectionId, name: &str) -> Self {
            Self {
                id,
                candidate: CandidateCore {
                    election_id,
                    name: name.to_string(),
                },
            }
        }
    }
}
