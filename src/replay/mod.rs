//! Chronological replay of race history
//!
//! This module provides the race sources and the driver that feeds races,
//! oldest first, through the rating engine into the store.

pub mod driver;
pub mod source;

pub use driver::{FailedRace, RaceProcessing, ReplayDriver, ReplayReport};
pub use source::{sort_races, InMemoryRaceSource, JsonRaceSource, RaceResultSource};
