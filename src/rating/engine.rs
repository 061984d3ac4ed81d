//! Rating engine
//!
//! For each cohort of a race the engine compares every athlete's expected
//! finishing position (seed rank, from the race-start ratings snapshot) with
//! the observed one (time rank), normalises the difference by the cohort's
//! virtual size and hands the resulting rank delta to the configured
//! strategy. Nothing is written here; the caller commits the outcomes.

use crate::cohort::{Cohort, CohortGrouper};
use crate::config::RatingConfig;
use crate::error::{RatingError, Result};
use crate::rating::elo::{seed_rank, virtual_inflation};
use crate::rating::multipliers::RaceType;
use crate::rating::strategy::{build_strategy, DeltaInput, RatingDeltaStrategy};
use crate::types::{AthleteId, FinishStatus, Race, RaceResult, Rating, MAX_TIME};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Ratings of a race's participants frozen at race start
#[derive(Debug, Clone, Default)]
pub struct RatingSnapshot {
    ratings: HashMap<AthleteId, Rating>,
    start_rating: Rating,
}

impl RatingSnapshot {
    pub fn new(ratings: HashMap<AthleteId, Rating>, start_rating: Rating) -> Self {
        Self {
            ratings,
            start_rating,
        }
    }

    pub fn empty(start_rating: Rating) -> Self {
        Self::new(HashMap::new(), start_rating)
    }

    /// Current rating, or the start rating for an athlete not seen before
    pub fn rating(&self, athlete_id: &str) -> Rating {
        self.ratings
            .get(athlete_id)
            .copied()
            .unwrap_or(self.start_rating)
    }

    pub fn contains(&self, athlete_id: &str) -> bool {
        self.ratings.contains_key(athlete_id)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

/// Computed rating transition of one athlete in one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteOutcome {
    pub athlete_id: AthleteId,
    pub cohort: String,
    pub real_size: usize,
    pub virtual_size: usize,
    pub comparison_size: usize,
    pub seed_rank: f64,
    /// Rank compared against the seed
    pub time_rank: f64,
    pub division_ordinal: f64,
    /// Ordinal among the comparison set's finishers, recorded in extended mode only
    pub extended_rank: Option<f64>,
    pub rank_delta: f64,
    pub rating_before: Rating,
    pub rating_delta: Rating,
    pub rating_after: Rating,
}

/// Check the ordering preconditions of one division
///
/// Finishers come first, sorted by finish time; status is OK exactly when a
/// finish time below the sentinel is present.
pub fn validate_cohort(label: &str, members: &[&RaceResult]) -> Result<()> {
    if members.is_empty() {
        return Err(RatingError::data_integrity(format!("empty cohort: {}", label)).into());
    }

    let mut previous_time = 0;
    let mut non_finisher_seen = false;
    for result in members {
        if result.finish_time >= MAX_TIME {
            if result.status == FinishStatus::Ok {
                return Err(RatingError::data_integrity(format!(
                    "athlete {} in {} has status OK without a finish time",
                    result.athlete_id, label
                ))
                .into());
            }
            non_finisher_seen = true;
        } else {
            if result.status != FinishStatus::Ok {
                return Err(RatingError::data_integrity(format!(
                    "athlete {} in {} has status {} with finish time {}",
                    result.athlete_id, label, result.status, result.finish_time
                ))
                .into());
            }
            if non_finisher_seen {
                return Err(RatingError::data_integrity(format!(
                    "athlete {} in {} finished after a non-finisher",
                    result.athlete_id, label
                ))
                .into());
            }
            if result.finish_time < previous_time {
                return Err(RatingError::data_integrity(format!(
                    "descending finish time in {}: {} after {} (athlete {})",
                    label, result.finish_time, previous_time, result.athlete_id
                ))
                .into());
            }
            previous_time = result.finish_time;
        }
    }

    Ok(())
}

/// 1-based position of `time` among `finisher_times`; equal times share the position
fn ordinal(time: u32, finisher_times: &[u32]) -> f64 {
    1.0 + finisher_times.iter().filter(|&&other| other < time).count() as f64
}

/// Rating engine
#[derive(Debug)]
pub struct RatingEngine {
    config: RatingConfig,
    grouper: CohortGrouper,
    strategy: Box<dyn RatingDeltaStrategy>,
    parallel_cohorts: bool,
}

impl RatingEngine {
    /// Create an engine with the strategy selected by configuration
    pub fn new(config: RatingConfig) -> Result<Self> {
        let strategy = build_strategy(&config);
        Self::with_strategy(config, strategy)
    }

    /// Create an engine with an explicit strategy
    pub fn with_strategy(
        config: RatingConfig,
        strategy: Box<dyn RatingDeltaStrategy>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            grouper: CohortGrouper::from_config(&config),
            config,
            strategy,
            parallel_cohorts: false,
        })
    }

    /// Compute independent cohorts of one race on the rayon pool
    pub fn with_parallel_cohorts(mut self, parallel: bool) -> Self {
        self.parallel_cohorts = parallel;
        self
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    pub fn strategy(&self) -> &dyn RatingDeltaStrategy {
        self.strategy.as_ref()
    }

    pub fn grouper(&self) -> &CohortGrouper {
        &self.grouper
    }

    /// Resolve the race-type multiplier of a distance label
    pub fn race_type_multiplier(&self, label: &str) -> Result<f64> {
        Ok(RaceType::from_label(label)?.multiplier(&self.config.race_types))
    }

    /// Rate every athlete of a race against one frozen snapshot
    ///
    /// Outcomes are returned in the race's result order. Any failure aborts the
    /// whole race before a single outcome is handed out.
    pub fn rate_race(&self, race: &Race, snapshot: &RatingSnapshot) -> Result<Vec<AthleteOutcome>> {
        let race_type_multiplier = self.race_type_multiplier(&race.info.race_type)?;

        let mut seen = HashSet::new();
        for result in &race.results {
            if !seen.insert(result.athlete_id.as_str()) {
                return Err(RatingError::data_integrity(format!(
                    "athlete {} appears twice in race {}",
                    result.athlete_id,
                    race.info.key()
                ))
                .into());
            }
        }

        let cohorts = self.grouper.group(&race.results);
        let per_cohort: Vec<Vec<AthleteOutcome>> = if self.parallel_cohorts {
            cohorts
                .par_iter()
                .map(|cohort| self.rate_cohort(cohort, snapshot, race_type_multiplier))
                .collect::<Result<Vec<_>>>()?
        } else {
            cohorts
                .iter()
                .map(|cohort| self.rate_cohort(cohort, snapshot, race_type_multiplier))
                .collect::<Result<Vec<_>>>()?
        };

        let mut by_athlete: HashMap<AthleteId, AthleteOutcome> = per_cohort
            .into_iter()
            .flatten()
            .map(|outcome| (outcome.athlete_id.clone(), outcome))
            .collect();

        race.results
            .iter()
            .map(|result| {
                by_athlete.remove(&result.athlete_id).ok_or_else(|| {
                    RatingError::invariant(format!(
                        "no rating outcome for athlete {}",
                        result.athlete_id
                    ))
                    .into()
                })
            })
            .collect()
    }

    /// Rate the members of one cohort
    pub fn rate_cohort(
        &self,
        cohort: &Cohort<'_>,
        snapshot: &RatingSnapshot,
        race_type_multiplier: f64,
    ) -> Result<Vec<AthleteOutcome>> {
        validate_cohort(&cohort.label, &cohort.members)?;

        let virtual_size = cohort.virtual_size;
        if virtual_size < 2 || virtual_size < cohort.comparison_size() {
            return Err(RatingError::data_integrity(format!(
                "invalid virtual size {} for cohort {}",
                virtual_size, cohort.label
            ))
            .into());
        }

        let real_size = cohort.real_size();
        let missing = virtual_size - cohort.comparison_size();
        let extended = cohort.is_extended();
        let start_rating = self.config.start_rating as f64;

        let comparison_ratings: Vec<f64> = cohort
            .comparison
            .iter()
            .map(|result| snapshot.rating(&result.athlete_id) as f64)
            .collect();

        let own_finisher_times: Vec<u32> = cohort
            .members
            .iter()
            .filter(|result| result.is_finished())
            .map(|result| result.finish_time)
            .collect();
        let comparison_finisher_times: Vec<u32> = cohort
            .comparison
            .iter()
            .filter(|result| result.is_finished())
            .map(|result| result.finish_time)
            .collect();

        // Members are sorted, so the first and last finisher bound the time spread
        let fastest = own_finisher_times.first().copied().unwrap_or(0);
        let slowest = own_finisher_times.last().copied().unwrap_or(0);
        let spread = slowest.saturating_sub(fastest);

        debug!(
            "rating cohort {} real size: {} virtual: {} comparison: {} extended: {}",
            cohort.label,
            real_size,
            virtual_size,
            cohort.comparison_size(),
            extended
        );

        let mut outcomes = Vec::with_capacity(real_size);
        // Members lead the comparison set, so member i sits at comparison index i
        for (i, result) in cohort.members.iter().enumerate() {
            let rating = snapshot.rating(&result.athlete_id);
            let finished = result.is_finished();

            let opponents: Vec<f64> = comparison_ratings
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, r)| *r)
                .collect();
            let seed = seed_rank(rating as f64, &opponents)
                + virtual_inflation(rating as f64, start_rating, missing);

            let division_ordinal = if finished {
                ordinal(result.finish_time, &own_finisher_times)
            } else {
                own_finisher_times.len() as f64 + 1.0
            };

            let extended_rank = if !extended {
                None
            } else if finished {
                Some(ordinal(result.finish_time, &comparison_finisher_times))
            } else {
                Some(comparison_finisher_times.len() as f64 + 1.0)
            };

            let time_rank = if !finished {
                virtual_size as f64 + 1.0
            } else if extended {
                division_ordinal
            } else if spread > 0 {
                1.0 + (real_size - 1) as f64 * (result.finish_time - fastest) as f64
                    / spread as f64
            } else {
                1.0
            };

            let rank_delta = (seed - time_rank) / (virtual_size - 1) as f64;
            if !finished && rank_delta > 0.0 {
                return Err(RatingError::invariant(format!(
                    "positive rank delta {} for non-finisher {} in {}",
                    rank_delta, result.athlete_id, cohort.label
                ))
                .into());
            }

            let finisher_opponents: Vec<f64> = cohort
                .members
                .iter()
                .zip(comparison_ratings.iter())
                .enumerate()
                .filter(|(j, (other, _))| *j != i && other.is_finished())
                .map(|(_, (_, r))| *r)
                .collect();

            let rating_delta = self.strategy.rating_delta(&DeltaInput {
                athlete_id: &result.athlete_id,
                rating,
                status: result.status,
                rank_delta,
                race_type_multiplier,
                finisher_opponents: &finisher_opponents,
                division_ordinal,
            })?;

            if !finished && rating_delta > 0 {
                return Err(RatingError::invariant(format!(
                    "positive rating delta {} for non-finisher {} in {}",
                    rating_delta, result.athlete_id, cohort.label
                ))
                .into());
            }
            if result.status == FinishStatus::Dns && rating_delta != 0 {
                return Err(RatingError::invariant(format!(
                    "non-zero rating delta {} for DNS athlete {}",
                    rating_delta, result.athlete_id
                ))
                .into());
            }

            debug!(
                "athlete {} seed: {:.3} time rank: {:.3} delta: {:.4} rating: {} -> {}",
                result.athlete_id,
                seed,
                time_rank,
                rank_delta,
                rating,
                rating + rating_delta
            );

            outcomes.push(AthleteOutcome {
                athlete_id: result.athlete_id.clone(),
                cohort: cohort.label.clone(),
                real_size,
                virtual_size,
                comparison_size: cohort.comparison_size(),
                seed_rank: seed,
                time_rank,
                division_ordinal,
                extended_rank,
                rank_delta,
                rating_before: rating,
                rating_delta,
                rating_after: rating + rating_delta,
            });
        }

        Ok(outcomes)
    }
}
