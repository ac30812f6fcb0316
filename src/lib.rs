//! Backend server for timed, single-choice elections.
//!
//! Administrators define elections and their candidates; registered voters
//! cast at most one vote per election while its window is open; results are
//! tallied once it closes. The one-vote-per-user-per-election invariant is
//! enforced by the database's unique eligibility-ledger index, not by any
//! in-process state; see [`eligibility`].

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod logging;
pub mod model;
pub mod tally;

pub use config::Config;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;

/// Assemble the server: all routes plus the config, database, and logging
/// fairings. The caller is responsible for launching it.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(LoggerFairing)
}
