//! Global competition ranking

use crate::types::AthleteRating;
use serde::{Deserialize, Serialize};

/// One row of the global ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAthlete {
    pub rank: usize,
    pub athlete: AthleteRating,
}

/// Assign competition ranks (1, 2, 2, 4) to athletes sorted by rating, highest first
///
/// `first_rank` is the rank of the first entry, for pages fetched with an offset.
/// Ties with entries before the page are not visible here.
pub fn competition_ranks(athletes: Vec<AthleteRating>, first_rank: usize) -> Vec<RankedAthlete> {
    let mut ranked: Vec<RankedAthlete> = Vec::with_capacity(athletes.len());
    for (position, athlete) in athletes.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(previous) if previous.athlete.rating == athlete.rating => previous.rank,
            _ => first_rank + position,
        };
        ranked.push(RankedAthlete { rank, athlete });
    }
    ranked
}
