//! Rating distribution report

use crate::types::{AthleteRating, Rating};
use crate::utils::median;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket boundaries of the standard report
pub const DEFAULT_CHUNKS: [Rating; 17] = [
    1200, 1300, 1400, 1450, 1500, 1550, 1600, 1700, 1800, 1900, 2000, 2150, 2300, 2450, 2700,
    3000, 3300,
];

/// Athletes whose rating falls in `[lower, upper)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    /// `None` below the first boundary
    pub lower: Option<Rating>,
    /// `None` above the last boundary
    pub upper: Option<Rating>,
    pub athletes: usize,
    pub median_race_count: Option<u32>,
}

impl fmt::Display for DistributionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lower = self
            .lower
            .map_or_else(|| "-inf".to_string(), |v| v.to_string());
        let upper = self
            .upper
            .map_or_else(|| "+inf".to_string(), |v| v.to_string());
        write!(
            f,
            "[{}, {}) count: {} races: {}",
            lower,
            upper,
            self.athletes,
            self.median_race_count.unwrap_or(0)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingDistribution {
    pub buckets: Vec<DistributionBucket>,
    pub total: usize,
}

impl fmt::Display for RatingDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bucket in &self.buckets {
            writeln!(f, "{}", bucket)?;
        }
        write!(f, "total: {}", self.total)
    }
}

/// Count athletes and their median race count per rating bucket
///
/// `chunks` must be increasing. The bucket below the first boundary is only
/// reported when it has athletes.
pub fn rating_distribution(athletes: &[AthleteRating], chunks: &[Rating]) -> RatingDistribution {
    // Slot 0 is below the first boundary, slot i + 1 starts at chunks[i]
    let mut race_counts: Vec<Vec<u32>> = vec![Vec::new(); chunks.len() + 1];
    for athlete in athletes {
        let slot = chunks.partition_point(|&boundary| boundary <= athlete.rating);
        race_counts[slot].push(athlete.race_count);
    }

    let buckets = race_counts
        .iter()
        .enumerate()
        .filter(|(slot, counts)| *slot > 0 || !counts.is_empty())
        .map(|(slot, counts)| DistributionBucket {
            lower: slot.checked_sub(1).map(|i| chunks[i]),
            upper: chunks.get(slot).copied(),
            athletes: counts.len(),
            median_race_count: median(counts),
        })
        .collect();

    RatingDistribution {
        buckets,
        total: athletes.len(),
    }
}
