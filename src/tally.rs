//! The tally engine: aggregation of vote records into per-candidate counts
//! and percentages, and the results-visibility gate.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::common::election::{CandidateId, ElectionPhase};
use crate::model::db::candidate::Candidate;

/// Count and share of the total for a single candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateTally {
    pub candidate_id: CandidateId,
    pub name: String,
    pub votes: u64,
    pub percentage: f64,
}

/// Aggregate cast votes into per-candidate tallies.
///
/// Candidates appear in the order given (election-defined), including those
/// with zero votes. Percentages are shares of the total cast; with no votes
/// at all every percentage is zero rather than a division error.
pub fn tally(
    candidates: &[Candidate],
    cast: impl IntoIterator<Item = CandidateId>,
) -> Vec<CandidateTally> {
    let mut counts: HashMap<CandidateId, u64> =
        candidates.iter().map(|c| (c.id, 0)).collect();
    let mut total: u64 = 0;
    for candidate_id in cast {
        if let Some(count) = counts.get_mut(&candidate_id) {
            *count += 1;
            total += 1;
        }
    }

    candidates
        .iter()
        .map(|candidate| {
            let votes = counts[&candidate.id];
            let percentage = if total == 0 {
                0.0
            } else {
                votes as f64 / total as f64 * 100.0
            };
            CandidateTally {
                candidate_id: candidate.id,
                name: candidate.name.clone(),
                votes,
                percentage,
            }
        })
        .collect()
}

/// Whether results may be shown: once the election is closed, or always to
/// administrators. Advisory display logic, not a security boundary.
pub fn results_visible(phase: ElectionPhase, is_admin: bool) -> bool {
    phase == ElectionPhase::Closed || is_admin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::example(1, 7, "Alice Zhang"),
            Candidate::example(2, 7, "Bob Okafor"),
            Candidate::example(3, 7, "Carol Mendes"),
        ]
    }

    #[test]
    fn counts_and_percentages() {
        let cast = [1, 1, 2, 1];
        let result = tally(&candidates(), cast);

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].votes, 3);
        assert_eq!(result[1].votes, 1);
        assert_eq!(result[2].votes, 0);
        assert_eq!(result[0].percentage, 75.0);
        assert_eq!(result[1].percentage, 25.0);
        assert_eq!(result[2].percentage, 0.0);
    }

    /// The counts always sum to the number of votes cast.
    #[test]
    fn tally_conservation() {
        let cast = [1, 2, 3, 3, 2, 1, 1];
        let result = tally(&candidates(), cast);
        let total: u64 = result.iter().map(|t| t.votes).sum();
        assert_eq!(total, cast.len() as u64);
    }

    /// Percentages sum to 100 within rounding tolerance whenever any votes
    /// were cast.
    #[test]
    fn percentage_law() {
        let cast = [1, 2, 3, 3, 2, 1, 1];
        let result = tally(&candidates(), cast);
        let sum: f64 = result.iter().map(|t| t.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_tally_has_all_zero_percentages() {
        let result = tally(&candidates(), []);
        assert_eq!(result.len(), 3);
        for entry in &result {
            assert_eq!(entry.votes, 0);
            assert_eq!(entry.percentage, 0.0);
        }
    }

    #[test]
    fn candidate_order_is_preserved() {
        // More votes for a later candidate must not reorder the result.
        let cast = [3, 3, 3, 1];
        let result = tally(&candidates(), cast);
        let ids: Vec<_> = result.iter().map(|t| t.candidate_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn no_candidates_no_panic() {
        assert!(tally(&[], [1, 2, 3]).is_empty());
    }

    /// A full election lifecycle at the engine level: an eligible voter
    /// casts exactly one vote, a second attempt is refused, and after close
    /// the tally reflects the single ballot.
    #[test]
    fn single_voter_lifecycle() {
        use chrono::TimeZone;
        use chrono::Utc;

        use crate::eligibility::{self, VoteDenial};
        use crate::model::db::election::ElectionCore;

        let election = ElectionCore {
            name: "Student Union Election".to_string(),
            position: "President".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            active: true,
        };
        let standing = vec![
            Candidate::example(1, 1, "Alice Zhang"),
            Candidate::example(2, 1, "Bob Okafor"),
        ];

        // Midway through the window the voter is eligible.
        let midday = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(
            eligibility::check(&election, standing.len() as u64, false, midday),
            Ok(())
        );

        // They vote for candidate 1; the ledger now has their row, so a
        // second attempt (for either candidate) is refused.
        let cast = vec![1_u32];
        assert_eq!(
            eligibility::check(&election, standing.len() as u64, true, midday),
            Err(VoteDenial::AlreadyVoted)
        );

        // A day after close the election classifies as such and results
        // show one vote for candidate 1, none for candidate 2.
        let later = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        assert_eq!(
            eligibility::classify(&election, later),
            crate::model::common::election::ElectionPhase::Closed
        );
        assert!(!results_visible(eligibility::classify(&election, midday), false));
        assert!(results_visible(eligibility::classify(&election, later), false));

        let result = tally(&standing, cast);
        assert_eq!(result[0].votes, 1);
        assert_eq!(result[0].percentage, 100.0);
        assert_eq!(result[1].votes, 0);
        assert_eq!(result[1].percentage, 0.0);
    }

    #[test]
    fn visibility_gate() {
        assert!(results_visible(ElectionPhase::Closed, false));
        assert!(results_visible(ElectionPhase::Closed, true));
        assert!(results_visible(ElectionPhase::Active, true));
        assert!(results_visible(ElectionPhase::Upcoming, true));
        assert!(!results_visible(ElectionPhase::Active, false));
        assert!(!results_visible(ElectionPhase::Upcoming, false));
    }
}
