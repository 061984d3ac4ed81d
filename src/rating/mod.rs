//! Rating computation, audit records and storage
//!
//! This module provides the Elo-style expected-outcome model, the rating
//! delta strategies, the per-race engine and the store interface the engine's
//! results are committed to.

pub mod elo;
pub mod engine;
pub mod history;
pub mod multipliers;
pub mod storage;
pub mod strategy;

// Re-export commonly used types
pub use engine::{AthleteOutcome, RatingEngine, RatingSnapshot};
pub use history::{HistoryWriter, RaceCommit};
pub use multipliers::RaceType;
pub use storage::{InMemoryRatingStore, RatingStore, StoreSnapshot};
pub use strategy::{
    build_strategy, ClosedFormStrategy, DeltaInput, InversionStrategy, RatingDeltaStrategy,
};
