//! Read-side reports over the rating store

pub mod distribution;
pub mod ranking;

pub use distribution::{rating_distribution, DistributionBucket, RatingDistribution, DEFAULT_CHUNKS};
pub use ranking::{competition_ranks, RankedAthlete};
