use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::eligibility;
use crate::model::common::election::{ElectionId, ElectionPhase};

/// Core election data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election name.
    pub name: String,
    /// The position being contested.
    pub position: String,
    /// Start of the voting window.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// End of the voting window. Strictly after `start_time`; enforced at
    /// creation and modification.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    /// Administrative switch. An inactive election counts as closed
    /// regardless of its window.
    pub active: bool,
}

impl ElectionCore {
    /// Where this election sits in its lifecycle at `now`.
    pub fn phase(&self, now: DateTime<Utc>) -> ElectionPhase {
        eligibility::classify(self, now)
    }
}

/// An election from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::common::time;

    #[test]
    fn example_phases() {
        let now = time::now();
        assert_eq!(
            ElectionCore::example_current().phase(now),
            ElectionPhase::Active
        );
        assert_eq!(
            ElectionCore::example_future().phase(now),
            ElectionPhase::Upcoming
        );
        assert_eq!(
            ElectionCore::example_past().phase(now),
            ElectionPhase::Closed
        );
    }
}
