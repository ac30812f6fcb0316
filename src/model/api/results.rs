use serde::Serialize;

use crate::model::common::election::{ElectionId, ElectionPhase};
use crate::tally::CandidateTally;

/// Tallied results for one election.
#[derive(Debug, Serialize)]
pub struct ElectionResults {
    pub election_id: ElectionId,
    pub name: String,
    pub position: String,
    pub phase: ElectionPhase,
    pub total_votes: u64,
    /// Per-candidate tallies, in election-defined order.
    pub candidates: Vec<CandidateTally>,
}
