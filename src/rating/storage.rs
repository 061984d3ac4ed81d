//! Rating storage interface and implementations
//!
//! This module defines the interface for persisting athlete ratings and their
//! append-only histories, with an in-memory implementation that can be saved
//! to and restored from a JSON snapshot.

use crate::error::{RatingError, Result};
use crate::rating::history::RaceCommit;
use crate::types::{AthleteId, AthleteRating, OrderBy, RaceKey, RaceSummary, Rating};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// Trait for rating storage operations
#[cfg_attr(test, mockall::automock)]
pub trait RatingStore: Send + Sync {
    /// Check whether an athlete record exists
    fn exists(&self, athlete_id: &str) -> Result<bool>;

    /// Current ratings of the known athletes among `athlete_ids`
    fn bulk_get_ratings(&self, athlete_ids: &[AthleteId]) -> Result<HashMap<AthleteId, Rating>>;

    /// Race counts of the known athletes among `athlete_ids`
    fn bulk_get_race_counts(&self, athlete_ids: &[AthleteId]) -> Result<HashMap<AthleteId, u32>>;

    /// Create a new athlete record
    fn create(&self, athlete: AthleteRating) -> Result<()>;

    /// Atomically update current fields and push one history entry
    fn append_race_result(&self, athlete_id: &str, summary: RaceSummary) -> Result<()>;

    /// Athletes ordered by `order_by`, ties by id; `limit == 0` means no limit
    fn top_n(&self, order_by: OrderBy, limit: usize, offset: usize) -> Result<Vec<AthleteRating>>;

    fn get_athlete(&self, athlete_id: &str) -> Result<Option<AthleteRating>>;

    /// Get total number of tracked athletes
    fn athlete_count(&self) -> Result<usize>;

    fn is_race_processed(&self, race: &RaceKey) -> Result<bool>;

    fn mark_race_processed(&self, race: RaceKey) -> Result<()>;

    /// Date of the most recent processed race
    fn last_processed_date(&self) -> Result<Option<NaiveDate>>;

    /// Apply every write of one race
    ///
    /// The default implementation goes through the single-record operations;
    /// stores that can hold one lock or transaction across the race should
    /// override it.
    fn commit_race(&self, commit: RaceCommit) -> Result<()> {
        if self.is_race_processed(&commit.race)? {
            return Err(RatingError::RaceAlreadyProcessed {
                race: commit.race.to_string(),
            }
            .into());
        }

        for athlete in commit.new_athletes {
            self.create(athlete)?;
        }
        for (athlete_id, summary) in commit.entries {
            self.append_race_result(&athlete_id, summary)?;
        }
        self.mark_race_processed(commit.race)
    }
}

/// Serialised form of an in-memory store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub athletes: Vec<AthleteRating>,
    pub processed_races: Vec<RaceKey>,
}

#[derive(Debug, Default)]
struct StoreState {
    athletes: HashMap<AthleteId, AthleteRating>,
    processed: BTreeSet<RaceKey>,
}

/// In-memory rating store implementation
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    state: RwLock<StoreState>,
}

impl InMemoryRatingStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| RatingError::storage("Failed to acquire store read lock").into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| RatingError::storage("Failed to acquire store write lock").into())
    }

    /// Restore a store from a snapshot, checking every history
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut athletes = HashMap::with_capacity(snapshot.athletes.len());
        for athlete in snapshot.athletes {
            athlete.check_history()?;
            if athletes.contains_key(&athlete.id) {
                return Err(RatingError::data_integrity(format!(
                    "athlete {} appears twice in snapshot",
                    athlete.id
                ))
                .into());
            }
            athletes.insert(athlete.id.clone(), athlete);
        }

        Ok(Self {
            state: RwLock::new(StoreState {
                athletes,
                processed: snapshot.processed_races.into_iter().collect(),
            }),
        })
    }

    /// Capture the current state; athletes are ordered by id
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        let state = self.read()?;

        let mut athletes: Vec<AthleteRating> = state.athletes.values().cloned().collect();
        athletes.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(StoreSnapshot {
            athletes,
            processed_races: state.processed.iter().cloned().collect(),
        })
    }

    /// Load a JSON snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RatingError::storage(format!("Failed to read store {}: {}", path.display(), e))
        })?;
        let snapshot: StoreSnapshot = serde_json::from_str(&contents).map_err(|e| {
            RatingError::storage(format!("Failed to parse store {}: {}", path.display(), e))
        })?;

        let store = Self::from_snapshot(snapshot)?;
        info!(
            "Loaded rating store from {} ({} athletes)",
            path.display(),
            store.athlete_count()?
        );
        Ok(store)
    }

    /// Load a snapshot if the file exists, otherwise start empty
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("No rating store at {}, starting empty", path.display());
            Ok(Self::new())
        }
    }

    /// Write a JSON snapshot file
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot()?;
        let contents = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| RatingError::storage(format!("Failed to serialize store: {}", e)))?;

        // Write next to the target, then rename over it
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents).map_err(|e| {
            RatingError::storage(format!("Failed to write store {}: {}", tmp.display(), e))
        })?;
        std::fs::rename(&tmp, path).map_err(|e| {
            RatingError::storage(format!("Failed to replace store {}: {}", path.display(), e))
        })?;

        info!(
            "Saved rating store to {} ({} athletes, {} races)",
            path.display(),
            snapshot.athletes.len(),
            snapshot.processed_races.len()
        );
        Ok(())
    }
}

impl RatingStore for InMemoryRatingStore {
    fn exists(&self, athlete_id: &str) -> Result<bool> {
        Ok(self.read()?.athletes.contains_key(athlete_id))
    }

    fn bulk_get_ratings(&self, athlete_ids: &[AthleteId]) -> Result<HashMap<AthleteId, Rating>> {
        let state = self.read()?;

        Ok(athlete_ids
            .iter()
            .filter_map(|id| state.athletes.get(id).map(|a| (id.clone(), a.rating)))
            .collect())
    }

    fn bulk_get_race_counts(&self, athlete_ids: &[AthleteId]) -> Result<HashMap<AthleteId, u32>> {
        let state = self.read()?;

        Ok(athlete_ids
            .iter()
            .filter_map(|id| state.athletes.get(id).map(|a| (id.clone(), a.race_count)))
            .collect())
    }

    fn create(&self, athlete: AthleteRating) -> Result<()> {
        athlete.check_history()?;
        let mut state = self.write()?;

        if state.athletes.contains_key(&athlete.id) {
            return Err(RatingError::data_integrity(format!(
                "athlete {} already exists",
                athlete.id
            ))
            .into());
        }
        state.athletes.insert(athlete.id.clone(), athlete);
        Ok(())
    }

    fn append_race_result(&self, athlete_id: &str, summary: RaceSummary) -> Result<()> {
        let mut state = self.write()?;

        let athlete = state.athletes.get_mut(athlete_id).ok_or_else(|| {
            RatingError::data_integrity(format!("unknown athlete {}", athlete_id))
        })?;
        athlete.apply(summary)
    }

    fn top_n(&self, order_by: OrderBy, limit: usize, offset: usize) -> Result<Vec<AthleteRating>> {
        let state = self.read()?;

        let mut athletes: Vec<&AthleteRating> = state.athletes.values().collect();
        athletes.sort_by(|a, b| {
            let primary = match order_by {
                OrderBy::RatingDesc => b.rating.cmp(&a.rating),
                OrderBy::RatingAsc => a.rating.cmp(&b.rating),
                OrderBy::RaceCountDesc => b.race_count.cmp(&a.race_count),
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        let limit = if limit == 0 { usize::MAX } else { limit };
        Ok(athletes
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn get_athlete(&self, athlete_id: &str) -> Result<Option<AthleteRating>> {
        Ok(self.read()?.athletes.get(athlete_id).cloned())
    }

    fn athlete_count(&self) -> Result<usize> {
        Ok(self.read()?.athletes.len())
    }

    fn is_race_processed(&self, race: &RaceKey) -> Result<bool> {
        Ok(self.read()?.processed.contains(race))
    }

    fn mark_race_processed(&self, race: RaceKey) -> Result<()> {
        self.write()?.processed.insert(race);
        Ok(())
    }

    fn last_processed_date(&self) -> Result<Option<NaiveDate>> {
        Ok(self.read()?.processed.iter().next_back().map(|race| race.date))
    }

    /// Validate the whole race under one write lock, then apply it
    fn commit_race(&self, commit: RaceCommit) -> Result<()> {
        let mut state = self.write()?;

        if state.processed.contains(&commit.race) {
            return Err(RatingError::RaceAlreadyProcessed {
                race: commit.race.to_string(),
            }
            .into());
        }

        let mut created: HashMap<&str, &AthleteRating> = HashMap::new();
        for athlete in &commit.new_athletes {
            athlete.check_history()?;
            if state.athletes.contains_key(&athlete.id)
                || created.insert(athlete.id.as_str(), athlete).is_some()
            {
                return Err(RatingError::data_integrity(format!(
                    "athlete {} already exists",
                    athlete.id
                ))
                .into());
            }
        }

        let mut touched = HashSet::new();
        for (athlete_id, summary) in &commit.entries {
            if !touched.insert(athlete_id.as_str()) {
                return Err(RatingError::data_integrity(format!(
                    "athlete {} has two entries for race {}",
                    athlete_id, commit.race
                ))
                .into());
            }

            let current = created
                .get(athlete_id.as_str())
                .copied()
                .or_else(|| state.athletes.get(athlete_id))
                .ok_or_else(|| {
                    RatingError::data_integrity(format!("unknown athlete {}", athlete_id))
                })?;
            current.check_next(summary)?;
        }

        // Everything checked; nothing below can fail half-way
        let RaceCommit {
            race,
            new_athletes,
            entries,
        } = commit;
        for athlete in new_athletes {
            state.athletes.insert(athlete.id.clone(), athlete);
        }
        let written = entries.len();
        for (athlete_id, summary) in entries {
            if let Some(athlete) = state.athletes.get_mut(&athlete_id) {
                athlete.apply(summary)?;
            }
        }
        debug!("committed {} history entries for {}", written, race);
        state.processed.insert(race);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinishStatus, Placement, RaceInfo, RaceResult};

    fn athlete(id: &str) -> AthleteRating {
        let result = RaceResult {
            athlete_id: id.to_string(),
            display_name: id.to_string(),
            gender: "M".to_string(),
            country: "AUS".to_string(),
            bib: String::new(),
            cohort: "M45-49".to_string(),
            status: FinishStatus::Ok,
            finish_time: 20_000,
            division: Placement::default(),
            gender_place: Placement::default(),
            overall: Placement::default(),
            legs: vec![],
        };
        AthleteRating::new(&result, 1500)
    }

    fn race_key(day: u32) -> RaceKey {
        RaceKey {
            date: NaiveDate::from_ymd_opt(2022, 4, day).unwrap(),
            name: format!("Race {}", day),
        }
    }

    fn summary(day: u32, index: u32, before: Rating, delta: Rating) -> RaceSummary {
        let key = race_key(day);
        RaceSummary {
            index,
            race: RaceInfo {
                name: key.name,
                date: key.date,
                race_type: "half".to_string(),
                country: "AUS".to_string(),
            },
            cohort: "M45-49".to_string(),
            real_size: 10,
            virtual_size: 10,
            comparison_size: 10,
            seed_rank: 5.0,
            time_rank: 3.0,
            division_ordinal: 3.0,
            extended_rank: None,
            rank_delta: 0.2,
            rating_before: before,
            rating_delta: delta,
            rating_after: before + delta,
            status: FinishStatus::Ok,
            finish_time: 20_000,
            country: "AUS".to_string(),
            bib: String::new(),
            division: Placement::default(),
            gender_place: Placement::default(),
            overall: Placement::default(),
            legs: vec![],
        }
    }

    fn commit(day: u32, new: Vec<AthleteRating>, entries: Vec<(&str, RaceSummary)>) -> RaceCommit {
        RaceCommit {
            race: race_key(day),
            new_athletes: new,
            entries: entries
                .into_iter()
                .map(|(id, summary)| (id.to_string(), summary))
                .collect(),
        }
    }

    #[test]
    fn test_create_and_bulk_reads() {
        let store = InMemoryRatingStore::new();
        store.create(athlete("a")).unwrap();
        store.create(athlete("b")).unwrap();

        assert!(store.exists("a").unwrap());
        assert!(!store.exists("z").unwrap());
        assert!(store.create(athlete("a")).is_err());

        let ids = vec!["a".to_string(), "z".to_string()];
        let ratings = store.bulk_get_ratings(&ids).unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings["a"], 1500);
        assert_eq!(store.bulk_get_race_counts(&ids).unwrap()["a"], 0);
        assert_eq!(store.athlete_count().unwrap(), 2);
    }

    #[test]
    fn test_append_race_result_moves_rating_and_history() {
        let store = InMemoryRatingStore::new();
        store.create(athlete("a")).unwrap();
        store.append_race_result("a", summary(1, 1, 1500, 25)).unwrap();

        let stored = store.get_athlete("a").unwrap().unwrap();
        assert_eq!(stored.rating, 1525);
        assert_eq!(stored.race_count, 1);
        assert_eq!(stored.history.len(), 1);

        // Stale rating_before is rejected and leaves the record untouched
        assert!(store.append_race_result("a", summary(2, 2, 1500, 5)).is_err());
        let stored = store.get_athlete("a").unwrap().unwrap();
        assert_eq!(stored.rating, 1525);
        assert_eq!(stored.history.len(), 1);

        assert!(store.append_race_result("ghost", summary(2, 1, 1500, 5)).is_err());
    }

    #[test]
    fn test_commit_race_is_all_or_nothing() {
        let store = InMemoryRatingStore::new();
        store
            .commit_race(commit(1, vec![athlete("a")], vec![("a", summary(1, 1, 1500, 10))]))
            .unwrap();

        // Second entry is wrong, so neither b nor a may change
        let bad = commit(
            2,
            vec![athlete("b")],
            vec![
                ("b", summary(2, 1, 1500, 4)),
                ("a", summary(2, 7, 1510, -4)),
            ],
        );
        let err = store.commit_race(bad).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::InvariantViolation { .. })
        ));
        assert!(!store.exists("b").unwrap());
        assert_eq!(store.get_athlete("a").unwrap().unwrap().rating, 1510);
        assert!(!store.is_race_processed(&race_key(2)).unwrap());
    }

    #[test]
    fn test_commit_race_twice_is_rejected() {
        let store = InMemoryRatingStore::new();
        let first = commit(3, vec![athlete("a")], vec![("a", summary(3, 1, 1500, 10))]);
        store.commit_race(first.clone()).unwrap();

        let err = store.commit_race(first).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::RaceAlreadyProcessed { .. })
        ));
        assert_eq!(store.get_athlete("a").unwrap().unwrap().race_count, 1);
        assert_eq!(
            store.last_processed_date().unwrap(),
            NaiveDate::from_ymd_opt(2022, 4, 3)
        );
    }

    #[test]
    fn test_top_n_ordering_and_paging() {
        let store = InMemoryRatingStore::new();
        for (id, rating, races) in [("c", 1600, 1), ("a", 1700, 3), ("b", 1600, 5), ("d", 1400, 2)] {
            let mut record = athlete(id);
            record.rating = rating;
            for index in 1..=races {
                let before = record.rating;
                record.apply(summary(index, index, before, 0)).unwrap();
            }
            store.create(record).unwrap();
        }

        let ids = |athletes: Vec<AthleteRating>| -> Vec<String> {
            athletes.into_iter().map(|a| a.id).collect()
        };

        assert_eq!(ids(store.top_n(OrderBy::RatingDesc, 0, 0).unwrap()), vec!["a", "b", "c", "d"]);
        assert_eq!(ids(store.top_n(OrderBy::RatingAsc, 2, 0).unwrap()), vec!["d", "b"]);
        assert_eq!(ids(store.top_n(OrderBy::RaceCountDesc, 2, 1).unwrap()), vec!["a", "d"]);
        assert!(store.top_n(OrderBy::RatingDesc, 10, 10).unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let store = InMemoryRatingStore::new();
        store
            .commit_race(commit(
                5,
                vec![athlete("b"), athlete("a")],
                vec![("b", summary(5, 1, 1500, 12)), ("a", summary(5, 1, 1500, -12))],
            ))
            .unwrap();

        let path = std::env::temp_dir().join(format!("triscore-store-{}.json", uuid::Uuid::new_v4()));
        store.save(&path).unwrap();
        let restored = InMemoryRatingStore::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let snapshot = restored.snapshot().unwrap();
        assert_eq!(snapshot.athletes[0].id, "a");
        assert_eq!(snapshot.athletes[1].rating, 1512);
        assert!(restored.is_race_processed(&race_key(5)).unwrap());
        assert_eq!(snapshot.athletes, store.snapshot().unwrap().athletes);
    }

    #[test]
    fn test_load_rejects_corrupt_history() {
        let mut broken = athlete("a");
        broken.race_count = 3;
        let snapshot = StoreSnapshot {
            athletes: vec![broken],
            processed_races: vec![],
        };
        assert!(InMemoryRatingStore::from_snapshot(snapshot).is_err());
    }
}
