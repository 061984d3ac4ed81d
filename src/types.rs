//! Common types used throughout the rating engine

use crate::error::{RatingError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Stable opaque identifier of an athlete
pub type AthleteId = String;

/// Integer rating points
pub type Rating = i64;

/// Sentinel finish time carried by every non-finisher
pub const MAX_TIME: u32 = 99_999;

/// How an athlete's race ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinishStatus {
    #[serde(rename = "OK", alias = "ok")]
    Ok,
    #[serde(rename = "DNF")]
    Dnf,
    #[serde(rename = "DNS")]
    Dns,
    #[serde(rename = "DQ")]
    Dq,
}

impl FinishStatus {
    pub fn is_finished(self) -> bool {
        self == FinishStatus::Ok
    }
}

impl std::fmt::Display for FinishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishStatus::Ok => write!(f, "OK"),
            FinishStatus::Dnf => write!(f, "DNF"),
            FinishStatus::Dns => write!(f, "DNS"),
            FinishStatus::Dq => write!(f, "DQ"),
        }
    }
}

/// Race segment of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Swim,
    T1,
    Bike,
    T2,
    Run,
}

/// Per-leg split echoed from the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSplit {
    pub leg: Leg,
    pub time_seconds: u32,
    #[serde(default)]
    pub division_rank: u32,
    #[serde(default)]
    pub gender_rank: u32,
    #[serde(default)]
    pub overall_rank: u32,
}

/// Precomputed placement within one scope (division, gender or overall)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub size: u32,
    pub rank: u32,
    /// Time-normalised, possibly fractional, rank
    pub time_rank: f64,
}

/// Race metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceInfo {
    pub name: String,
    pub date: NaiveDate,
    /// Free-text distance label ("Olympic", "Ironman 70.3 half", ...)
    #[serde(rename = "type")]
    pub race_type: String,
    #[serde(default)]
    pub country: String,
}

impl RaceInfo {
    pub fn key(&self) -> RaceKey {
        RaceKey {
            name: self.name.clone(),
            date: self.date,
        }
    }
}

/// Identity of a race for idempotency tracking
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RaceKey {
    pub date: NaiveDate,
    pub name: String,
}

impl std::fmt::Display for RaceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.date, self.name)
    }
}

/// One athlete's result in one race, as normalised by the loaders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub athlete_id: AthleteId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub bib: String,
    /// Division label the athlete is rated in
    pub cohort: String,
    pub status: FinishStatus,
    pub finish_time: u32,
    #[serde(default)]
    pub division: Placement,
    #[serde(default)]
    pub gender_place: Placement,
    #[serde(default)]
    pub overall: Placement,
    #[serde(default)]
    pub legs: Vec<LegSplit>,
}

impl RaceResult {
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }
}

/// A race with its results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    #[serde(flatten)]
    pub info: RaceInfo,
    pub results: Vec<RaceResult>,
}

/// Immutable audit record of one athlete's rating transition in one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSummary {
    /// Race count after this race
    pub index: u32,
    pub race: RaceInfo,
    pub cohort: String,
    pub real_size: usize,
    pub virtual_size: usize,
    /// Number of results the seed was computed against (own division plus borrowed neighbours)
    pub comparison_size: usize,
    pub seed_rank: f64,
    pub time_rank: f64,
    pub division_ordinal: f64,
    pub extended_rank: Option<f64>,
    pub rank_delta: f64,
    pub rating_before: Rating,
    pub rating_delta: Rating,
    pub rating_after: Rating,

    // Echoed inputs
    pub status: FinishStatus,
    pub finish_time: u32,
    pub country: String,
    pub bib: String,
    pub division: Placement,
    pub gender_place: Placement,
    pub overall: Placement,
    pub legs: Vec<LegSplit>,
}

impl RaceSummary {
    pub fn race_key(&self) -> RaceKey {
        self.race.key()
    }
}

/// Authoritative per-athlete state plus append-only history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteRating {
    pub id: AthleteId,
    pub name: String,
    pub gender: String,
    pub rating: Rating,
    pub race_count: u32,
    pub last_cohort: String,
    pub last_country: String,
    pub history: Vec<RaceSummary>,
}

impl AthleteRating {
    /// Create a record for an athlete observed for the first time
    pub fn new(result: &RaceResult, start_rating: Rating) -> Self {
        Self {
            id: result.athlete_id.clone(),
            name: result.display_name.clone(),
            gender: result.gender.clone(),
            rating: start_rating,
            race_count: 0,
            last_cohort: result.cohort.clone(),
            last_country: result.country.clone(),
            history: Vec::new(),
        }
    }

    /// Check `race_count == len(history)` and the history index sequence
    pub fn check_history(&self) -> Result<()> {
        if self.history.len() != self.race_count as usize {
            return Err(RatingError::invariant(format!(
                "athlete {} has {} history entries but race count {}",
                self.id,
                self.history.len(),
                self.race_count
            ))
            .into());
        }

        for (position, summary) in self.history.iter().enumerate() {
            if summary.index as usize != position + 1 {
                return Err(RatingError::invariant(format!(
                    "athlete {} history entry {} carries index {}",
                    self.id,
                    position + 1,
                    summary.index
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Check that `summary` is the next entry of this athlete's history
    pub fn check_next(&self, summary: &RaceSummary) -> Result<()> {
        if self.history.len() != self.race_count as usize {
            return Err(RatingError::invariant(format!(
                "athlete {} has {} history entries but race count {}",
                self.id,
                self.history.len(),
                self.race_count
            ))
            .into());
        }
        if summary.index != self.race_count + 1 {
            return Err(RatingError::invariant(format!(
                "athlete {} expected history index {} but got {}",
                self.id,
                self.race_count + 1,
                summary.index
            ))
            .into());
        }
        if summary.rating_before != self.rating {
            return Err(RatingError::invariant(format!(
                "athlete {} rated from {} but current rating is {}",
                self.id, summary.rating_before, self.rating
            ))
            .into());
        }

        Ok(())
    }

    /// Apply one race summary: current fields and history move together
    pub fn apply(&mut self, summary: RaceSummary) -> Result<()> {
        self.check_next(&summary)?;

        self.rating = summary.rating_after;
        self.race_count = summary.index;
        self.last_cohort = summary.cohort.clone();
        self.last_country = summary.country.clone();
        self.history.push(summary);
        Ok(())
    }

    pub fn last_race_date(&self) -> Option<NaiveDate> {
        self.history.last().map(|summary| summary.race.date)
    }
}

/// Ordering for `top_n` queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    RatingDesc,
    RatingAsc,
    RaceCountDesc,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str) -> RaceResult {
        RaceResult {
            athlete_id: id.to_string(),
            display_name: "Test Athlete".to_string(),
            gender: "M".to_string(),
            country: "ESP".to_string(),
            bib: "17".to_string(),
            cohort: "M30-34".to_string(),
            status: FinishStatus::Ok,
            finish_time: 36_000,
            division: Placement::default(),
            gender_place: Placement::default(),
            overall: Placement::default(),
            legs: vec![],
        }
    }

    fn summary(index: u32, before: Rating, delta: Rating) -> RaceSummary {
        RaceSummary {
            index,
            race: RaceInfo {
                name: "Challenge Roth".to_string(),
                date: NaiveDate::from_ymd_opt(2019, 7, 7).unwrap(),
                race_type: "full".to_string(),
                country: "GER".to_string(),
            },
            cohort: "M35-39".to_string(),
            real_size: 12,
            virtual_size: 12,
            comparison_size: 12,
            seed_rank: 6.5,
            time_rank: 4.0,
            division_ordinal: 4.0,
            extended_rank: None,
            rank_delta: 0.23,
            rating_before: before,
            rating_delta: delta,
            rating_after: before + delta,
            status: FinishStatus::Ok,
            finish_time: 35_000,
            country: "GER".to_string(),
            bib: "17".to_string(),
            division: Placement::default(),
            gender_place: Placement::default(),
            overall: Placement::default(),
            legs: vec![],
        }
    }

    #[test]
    fn test_finish_status_serde() {
        let parsed: FinishStatus = serde_json::from_str("\"ok\"").unwrap();
        assert_eq!(parsed, FinishStatus::Ok);
        let parsed: FinishStatus = serde_json::from_str("\"DNS\"").unwrap();
        assert_eq!(parsed, FinishStatus::Dns);
        assert_eq!(serde_json::to_string(&FinishStatus::Dq).unwrap(), "\"DQ\"");
        assert!(FinishStatus::Ok.is_finished());
        assert!(!FinishStatus::Dnf.is_finished());
    }

    #[test]
    fn test_new_athlete_defaults() {
        let athlete = AthleteRating::new(&result("a1"), 1500);
        assert_eq!(athlete.rating, 1500);
        assert_eq!(athlete.race_count, 0);
        assert!(athlete.history.is_empty());
        assert_eq!(athlete.last_cohort, "M30-34");
        assert!(athlete.check_history().is_ok());
    }

    #[test]
    fn test_apply_moves_fields_with_history() {
        let mut athlete = AthleteRating::new(&result("a1"), 1500);
        athlete.apply(summary(1, 1500, 40)).unwrap();

        assert_eq!(athlete.rating, 1540);
        assert_eq!(athlete.race_count, 1);
        assert_eq!(athlete.history.len(), 1);
        assert_eq!(athlete.last_cohort, "M35-39");
        assert_eq!(athlete.last_country, "GER");
        assert!(athlete.check_history().is_ok());
    }

    #[test]
    fn test_apply_rejects_wrong_index() {
        let mut athlete = AthleteRating::new(&result("a1"), 1500);
        let err = athlete.apply(summary(2, 1500, 40)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::InvariantViolation { .. })
        ));
        assert_eq!(athlete.race_count, 0);
        assert!(athlete.history.is_empty());
    }

    #[test]
    fn test_check_history_detects_corruption() {
        let mut athlete = AthleteRating::new(&result("a1"), 1500);
        athlete.apply(summary(1, 1500, 40)).unwrap();
        athlete.race_count = 2;
        assert!(athlete.check_history().is_err());
    }

    #[test]
    fn test_race_json_shape() {
        let json = r#"{
            "name": "Ironman Frankfurt",
            "date": "2019-06-30",
            "type": "full",
            "country": "GER",
            "results": [
                {"athlete_id": "a1", "cohort": "M30-34", "status": "OK", "finish_time": 32000}
            ]
        }"#;
        let race: Race = serde_json::from_str(json).unwrap();
        assert_eq!(race.info.race_type, "full");
        assert_eq!(race.results.len(), 1);
        assert_eq!(race.results[0].division, Placement::default());
        assert_eq!(race.info.key().to_string(), "2019-06-30 Ironman Frankfurt");
    }
}
