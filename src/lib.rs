//! Triscore - chronological rating engine for age-graded triathlon results
//!
//! This crate replays race results oldest first and moves every athlete's
//! Elo-style rating by how they finished relative to what the ratings
//! predicted, keeping an append-only audit history per athlete.

pub mod cohort;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod replay;
pub mod report;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RatingError, Result};
pub use types::*;

// Re-export key components
pub use rating::{InMemoryRatingStore, RatingEngine, RatingStore};
pub use replay::{JsonRaceSource, RaceResultSource, ReplayDriver};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
