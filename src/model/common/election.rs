use serde::{Deserialize, Serialize};

/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our candidate IDs are integers.
pub type CandidateId = u32;

/// Where an election sits in its lifecycle relative to a given instant.
///
/// Exactly one phase holds for any well-formed election; see
/// [`crate::eligibility::classify`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionPhase {
    /// Not yet open: the start of the voting window is in the future.
    Upcoming,
    /// Open for voting right now.
    Active,
    /// Over: the window has passed, or the election was deactivated.
    Closed,
}
