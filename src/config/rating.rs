//! Rating engine configuration
//!
//! All tunables of the engine live in one explicit object that is built once
//! and handed to the engine, so formula tuning never touches control flow.

use crate::error::{RatingError, Result};
use crate::types::Rating;
use serde::{Deserialize, Serialize};

/// Which rating-delta formula the engine applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Rank delta times the race-type, score and finish multiplier stack
    ClosedForm,
    /// Binary-search the rating that would have predicted the observed rank
    Inversion,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::ClosedForm => write!(f, "closed_form"),
            StrategyKind::Inversion => write!(f, "inversion"),
        }
    }
}

/// Constants of the asymmetric score multiplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreMultiplierParams {
    /// Scale applied to gains
    pub a: f64,
    /// Logarithm base, times ten
    pub b: f64,
    /// Scale applied to losses
    pub c: f64,
}

impl Default for ScoreMultiplierParams {
    fn default() -> Self {
        Self {
            a: 6.0,
            b: 12.0,
            c: 3.0,
        }
    }
}

impl ScoreMultiplierParams {
    pub fn base(&self) -> f64 {
        self.b * 0.1
    }
}

/// Multipliers per distance category, shortest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceTypeMultipliers {
    pub supersprint: f64,
    pub sprint: f64,
    pub olympic: f64,
    pub half: f64,
    pub full: f64,
}

impl Default for RaceTypeMultipliers {
    fn default() -> Self {
        Self {
            supersprint: 0.5,
            sprint: 1.0,
            olympic: 2.0,
            half: 4.0,
            full: 8.0,
        }
    }
}

/// Multipliers applied according to how the race ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishMultipliers {
    /// Finished and met or beat expectation
    pub finished_gain: f64,
    /// Finished below expectation
    pub finished_loss: f64,
    /// DNF and DQ
    pub other: f64,
}

impl Default for FinishMultipliers {
    fn default() -> Self {
        Self {
            finished_gain: 1.2,
            finished_loss: 0.8,
            other: 1.0,
        }
    }
}

/// Search bounds of the inversion strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InversionSettings {
    pub min_rating: f64,
    pub max_rating: f64,
    pub iterations: u32,
}

impl Default for InversionSettings {
    fn default() -> Self {
        Self {
            min_rating: 1.0,
            max_rating: 8000.0,
            iterations: 40,
        }
    }
}

/// Rating engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub start_rating: Rating,
    pub min_group_size: usize,
    pub strategy: StrategyKind,
    /// Borrow neighbouring age bands for seed and rank math
    pub extend_cohorts: bool,
    pub score: ScoreMultiplierParams,
    pub race_types: RaceTypeMultipliers,
    pub finish: FinishMultipliers,
    pub inversion: InversionSettings,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            start_rating: 1500,
            min_group_size: 10,
            strategy: StrategyKind::ClosedForm,
            extend_cohorts: false,
            score: ScoreMultiplierParams::default(),
            race_types: RaceTypeMultipliers::default(),
            finish: FinishMultipliers::default(),
            inversion: InversionSettings::default(),
        }
    }
}

impl RatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.start_rating <= 0 {
            return Err(RatingError::configuration("Start rating must be positive").into());
        }

        if self.min_group_size < 2 {
            return Err(RatingError::configuration("Min group size must be at least 2").into());
        }

        if self.score.base() <= 1.0 {
            return Err(RatingError::configuration(format!(
                "Score multiplier base B*0.1 must exceed 1, got {}",
                self.score.base()
            ))
            .into());
        }

        if self.score.a <= 0.0 || self.score.c <= 0.0 {
            return Err(
                RatingError::configuration("Score multiplier scales must be positive").into(),
            );
        }

        let race_types = &self.race_types;
        let ladder = [
            race_types.supersprint,
            race_types.sprint,
            race_types.olympic,
            race_types.half,
            race_types.full,
        ];
        if ladder[0] <= 0.0 || ladder.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(RatingError::configuration(
                "Race type multipliers must be positive and strictly increasing with distance",
            )
            .into());
        }

        let finish = &self.finish;
        if [finish.finished_gain, finish.finished_loss, finish.other]
        .iter()
        .any(|m| *m < 0.0 || !m.is_finite())
        {
            return Err(
                RatingError::configuration("Finish multipliers must be non-negative").into(),
            );
        }

        let inversion = &self.inversion;
        if inversion.min_rating >= inversion.max_rating {
            return Err(RatingError::configuration(format!(
                "Inversion bounds are empty: [{}, {}]",
                inversion.min_rating, inversion.max_rating
            ))
            .into());
        }
        if inversion.iterations == 0 {
            return Err(
                RatingError::configuration("Inversion iterations must be greater than 0").into(),
            );
        }

        Ok(())
    }
}
