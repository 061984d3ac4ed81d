//! Audit record assembly
//!
//! Turns the engine's outcomes for one race into `RaceSummary` entries and
//! hands them to the store as a single commit.

use crate::error::{RatingError, Result};
use crate::rating::engine::AthleteOutcome;
use crate::rating::storage::RatingStore;
use crate::types::{AthleteId, AthleteRating, Race, RaceKey, RaceResult, RaceSummary, Rating};
use tracing::debug;

/// Every write produced by one race, applied by the store all-or-nothing
#[derive(Debug, Clone, PartialEq)]
pub struct RaceCommit {
    pub race: RaceKey,
    /// Athletes seen for the first time, created with an empty history
    pub new_athletes: Vec<AthleteRating>,
    /// History entries in the race's result order
    pub entries: Vec<(AthleteId, RaceSummary)>,
}

impl RaceCommit {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds and commits audit records
#[derive(Debug, Clone)]
pub struct HistoryWriter {
    start_rating: Rating,
}

impl HistoryWriter {
    pub fn new(start_rating: Rating) -> Self {
        Self { start_rating }
    }

    /// Audit record of one athlete's transition, echoing the source result
    pub fn summarize(
        &self,
        race: &Race,
        result: &RaceResult,
        outcome: &AthleteOutcome,
        index: u32,
    ) -> RaceSummary {
        RaceSummary {
            index,
            race: race.info.clone(),
            cohort: outcome.cohort.clone(),
            real_size: outcome.real_size,
            virtual_size: outcome.virtual_size,
            comparison_size: outcome.comparison_size,
            seed_rank: outcome.seed_rank,
            time_rank: outcome.time_rank,
            division_ordinal: outcome.division_ordinal,
            extended_rank: outcome.extended_rank,
            rank_delta: outcome.rank_delta,
            rating_before: outcome.rating_before,
            rating_delta: outcome.rating_delta,
            rating_after: outcome.rating_after,
            status: result.status,
            finish_time: result.finish_time,
            country: result.country.clone(),
            bib: result.bib.clone(),
            division: result.division.clone(),
            gender_place: result.gender_place.clone(),
            overall: result.overall.clone(),
            legs: result.legs.clone(),
        }
    }

    /// Pair outcomes with results and number the new history entries
    ///
    /// `outcomes` must be in the race's result order, as `RatingEngine::rate_race`
    /// returns them.
    pub fn build_commit(
        &self,
        race: &Race,
        outcomes: &[AthleteOutcome],
        store: &dyn RatingStore,
    ) -> Result<RaceCommit> {
        if outcomes.len() != race.results.len() {
            return Err(RatingError::invariant(format!(
                "{} outcomes for {} results in race {}",
                outcomes.len(),
                race.results.len(),
                race.info.key()
            ))
            .into());
        }

        let ids: Vec<AthleteId> = race
            .results
            .iter()
            .map(|result| result.athlete_id.clone())
            .collect();
        let race_counts = store.bulk_get_race_counts(&ids)?;

        let mut new_athletes = Vec::new();
        let mut entries = Vec::with_capacity(outcomes.len());
        for (result, outcome) in race.results.iter().zip(outcomes) {
            if result.athlete_id != outcome.athlete_id {
                return Err(RatingError::invariant(format!(
                    "outcome for {} paired with result of {}",
                    outcome.athlete_id, result.athlete_id
                ))
                .into());
            }

            let index = match race_counts.get(&result.athlete_id) {
                Some(count) => count + 1,
                None => {
                    new_athletes.push(AthleteRating::new(result, self.start_rating));
                    1
                }
            };

            entries.push((
                result.athlete_id.clone(),
                self.summarize(race, result, outcome, index),
            ));
        }

        debug!(
            "built commit for {}: {} entries, {} new athletes",
            race.info.key(),
            entries.len(),
            new_athletes.len()
        );

        Ok(RaceCommit {
            race: race.info.key(),
            new_athletes,
            entries,
        })
    }

    /// Build and commit; returns the number of history entries written
    pub fn write(
        &self,
        race: &Race,
        outcomes: &[AthleteOutcome],
        store: &dyn RatingStore,
    ) -> Result<usize> {
        let commit = self.build_commit(race, outcomes, store)?;
        let written = commit.len();
        store.commit_race(commit)?;
        Ok(written)
    }
}
