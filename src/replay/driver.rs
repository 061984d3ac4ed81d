//! Chronological replay driver
//!
//! Feeds races oldest first through the engine. Each race is read from one
//! ratings snapshot, computed completely in memory and committed as a unit
//! before the next race starts.

use crate::config::ReplaySettings;
use crate::error::{rating_error, RatingError, Result};
use crate::metrics::{MetricsCollector, RaceOutcome};
use crate::rating::{AthleteOutcome, HistoryWriter, RatingEngine, RatingSnapshot, RatingStore};
use crate::replay::source::RaceResultSource;
use crate::types::{AthleteId, Race};
use crate::utils::{current_timestamp, generate_run_id};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A race that could not be applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRace {
    pub race: String,
    /// `RatingError::kind`, or "other" for foreign errors
    pub kind: String,
    pub message: String,
}

/// Summary of one replay run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub races_seen: usize,
    pub committed: usize,
    pub skipped: usize,
    pub failed: Vec<FailedRace>,
    /// History entries written
    pub athletes_rated: usize,
}

impl ReplayReport {
    fn new() -> Self {
        let now = current_timestamp();
        Self {
            run_id: generate_run_id(),
            started_at: now,
            finished_at: now,
            races_seen: 0,
            committed: 0,
            skipped: 0,
            failed: Vec::new(),
            athletes_rated: 0,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of feeding one race to the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceProcessing {
    /// Number of history entries written
    Committed(usize),
    /// Already applied earlier
    Skipped,
}

/// Replays races against a store
pub struct ReplayDriver {
    engine: RatingEngine,
    writer: HistoryWriter,
    store: Arc<dyn RatingStore>,
    metrics: Arc<MetricsCollector>,
    settings: ReplaySettings,
    last_date: Option<NaiveDate>,
}

impl ReplayDriver {
    /// Create a driver; the chronological guard starts at the store's last race
    pub fn new(
        engine: RatingEngine,
        store: Arc<dyn RatingStore>,
        metrics: Arc<MetricsCollector>,
        settings: ReplaySettings,
    ) -> Result<Self> {
        settings.validate()?;
        let last_date = store.last_processed_date()?;
        if let Some(date) = last_date {
            info!("Resuming after races dated {}", date);
        }

        Ok(Self {
            writer: HistoryWriter::new(engine.config().start_rating),
            engine,
            store,
            metrics,
            settings,
            last_date,
        })
    }

    pub fn store(&self) -> Arc<dyn RatingStore> {
        self.store.clone()
    }

    pub fn engine(&self) -> &RatingEngine {
        &self.engine
    }

    /// Rate and commit one race
    pub fn process_race(&mut self, race: &Race) -> Result<RaceProcessing> {
        let key = race.info.key();

        if self.store.is_race_processed(&key)? {
            warn!("Skipping already processed race {}", key);
            self.metrics.record_race(RaceOutcome::Skipped, None);
            return Ok(RaceProcessing::Skipped);
        }

        if let Some(last) = self.last_date {
            if race.info.date < last {
                return Err(RatingError::data_integrity(format!(
                    "race {} is older than the last processed race ({})",
                    key, last
                ))
                .into());
            }
        }

        // Unknown race types fail before any athlete is read
        self.engine.race_type_multiplier(&race.info.race_type)?;

        let timer = self.metrics.start_timer();

        let ids: Vec<AthleteId> = race
            .results
            .iter()
            .map(|result| result.athlete_id.clone())
            .collect();
        let snapshot = RatingSnapshot::new(
            self.store.bulk_get_ratings(&ids)?,
            self.engine.config().start_rating,
        );
        debug!(
            "race {}: {} results, {} known athletes",
            key,
            ids.len(),
            snapshot.len()
        );

        let outcomes = self.engine.rate_race(race, &snapshot)?;
        let written = self.writer.write(race, &outcomes, self.store.as_ref())?;

        self.record_outcomes(&outcomes);
        self.metrics
            .record_race(RaceOutcome::Committed, Some(timer.stop()));
        self.metrics
            .set_athletes_tracked(self.store.athlete_count()?);
        self.last_date = Some(race.info.date);

        Ok(RaceProcessing::Committed(written))
    }

    fn record_outcomes(&self, outcomes: &[AthleteOutcome]) {
        let mut cohorts: BTreeMap<&str, bool> = BTreeMap::new();
        for outcome in outcomes {
            cohorts.insert(&outcome.cohort, outcome.extended_rank.is_some());
            self.metrics.record_rating_delta(outcome.rating_delta);
        }
        for extended in cohorts.values() {
            self.metrics.record_cohort(*extended);
        }
    }

    /// Replay the source's window of races
    ///
    /// With `stop_on_error` the first failed race aborts the run and its error
    /// is returned; otherwise failures are logged, collected in the report and
    /// the replay moves on.
    pub fn run(&mut self, source: &dyn RaceResultSource) -> Result<ReplayReport> {
        let mut report = ReplayReport::new();
        let races = source.races(self.settings.skip, self.settings.limit())?;
        let total = races.len();

        info!(
            "Starting replay {} over {} races (skip {})",
            report.run_id, total, self.settings.skip
        );

        for (i, race) in races.iter().enumerate() {
            report.races_seen += 1;
            let key = race.info.key();

            if (i + 1) % self.settings.progress_interval == 0 || i + 1 == total {
                info!("{}/{} {}", i + 1, total, key);
            }

            match self.process_race(race) {
                Ok(RaceProcessing::Committed(written)) => {
                    report.committed += 1;
                    report.athletes_rated += written;
                }
                Ok(RaceProcessing::Skipped) => report.skipped += 1,
                Err(err) => {
                    self.metrics.record_race(RaceOutcome::Failed, None);
                    let kind = rating_error(&err).map_or("other", |e| e.kind());

                    if self.settings.stop_on_error {
                        error!("Race {} failed ({}): {}", key, kind, err);
                        return Err(err.context(format!("replay aborted at race {}", key)));
                    }

                    warn!("Race {} failed ({}), continuing: {}", key, kind, err);
                    report.failed.push(FailedRace {
                        race: key.to_string(),
                        kind: kind.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        report.finished_at = current_timestamp();
        info!(
            "Replay {} finished: {} committed, {} skipped, {} failed, {} athlete results",
            report.run_id,
            report.committed,
            report.skipped,
            report.failed.len(),
            report.athletes_rated
        );
        Ok(report)
    }
}
