//! Rating delta strategies
//!
//! This module defines the interface that turns an athlete's rank delta into
//! integer rating points, and the two formulas the engine can be configured with.

use crate::config::{
    FinishMultipliers, InversionSettings, RatingConfig, ScoreMultiplierParams, StrategyKind,
};
use crate::error::{RatingError, Result};
use crate::rating::elo::seed_rank;
use crate::rating::multipliers::{finish_multiplier, score_multiplier};
use crate::types::{FinishStatus, Rating};

/// Everything a strategy may look at for one athlete in one cohort
#[derive(Debug, Clone)]
pub struct DeltaInput<'a> {
    pub athlete_id: &'a str,
    /// Rating from the race-start snapshot
    pub rating: Rating,
    pub status: FinishStatus,
    /// Normalised seed-vs-time rank difference, positive = beat expectation
    pub rank_delta: f64,
    pub race_type_multiplier: f64,
    /// Ratings of the other finishers of the athlete's own division
    pub finisher_opponents: &'a [f64],
    /// Ordinal by time within the athlete's own division (finishers + 1 for non-finishers)
    pub division_ordinal: f64,
}

/// Trait for turning a rank delta into rating points
pub trait RatingDeltaStrategy: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> StrategyKind;

    /// Rating change for one athlete; DNS must yield exactly 0
    fn rating_delta(&self, input: &DeltaInput<'_>) -> Result<Rating>;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;
}

/// Build the strategy selected by configuration
pub fn build_strategy(config: &RatingConfig) -> Box<dyn RatingDeltaStrategy> {
    match config.strategy {
        StrategyKind::ClosedForm => Box::new(ClosedFormStrategy::new(
            config.score.clone(),
            config.finish.clone(),
        )),
        StrategyKind::Inversion => Box::new(InversionStrategy::new(config.inversion.clone())),
    }
}

fn to_points(value: f64, input: &DeltaInput<'_>) -> Result<Rating> {
    if !value.is_finite() {
        return Err(RatingError::invariant(format!(
            "non-finite rating delta {} for athlete {}",
            value, input.athlete_id
        ))
        .into());
    }
    Ok(value.round_ties_even() as Rating)
}

/// `round(δ × raceType × score × finish)`
#[derive(Debug, Clone)]
pub struct ClosedFormStrategy {
    score: ScoreMultiplierParams,
    finish: FinishMultipliers,
}

impl ClosedFormStrategy {
    pub fn new(score: ScoreMultiplierParams, finish: FinishMultipliers) -> Self {
        Self { score, finish }
    }
}

impl Default for ClosedFormStrategy {
    fn default() -> Self {
        Self::new(ScoreMultiplierParams::default(), FinishMultipliers::default())
    }
}

impl RatingDeltaStrategy for ClosedFormStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ClosedForm
    }

    fn rating_delta(&self, input: &DeltaInput<'_>) -> Result<Rating> {
        if input.status == FinishStatus::Dns {
            return Ok(0);
        }

        let value = input.rank_delta
            * input.race_type_multiplier
            * score_multiplier(input.rank_delta, input.rating as f64, &self.score)
            * finish_multiplier(input.status, input.rank_delta, &self.finish);

        to_points(value, input)
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "closed_form",
            "a": self.score.a,
            "b": self.score.b,
            "c": self.score.c,
            "finished_gain": self.finish.finished_gain,
            "finished_loss": self.finish.finished_loss,
            "other": self.finish.other,
        })
    }
}

/// Move the rating to the one whose seed equals the geometric mean of seed and outcome
#[derive(Debug, Clone)]
pub struct InversionStrategy {
    settings: InversionSettings,
}

impl InversionStrategy {
    pub fn new(settings: InversionSettings) -> Self {
        Self { settings }
    }

    /// Bisect for the rating whose seed rank against `opponents` equals `target_rank`
    ///
    /// Without opponents every rating has seed 1, so the current rating is kept.
    pub fn rating_for_rank(&self, opponents: &[f64], target_rank: f64, current: f64) -> f64 {
        if opponents.is_empty() {
            return current;
        }

        let mut low = self.settings.min_rating;
        let mut high = self.settings.max_rating;
        for _ in 0..self.settings.iterations {
            let mid = (low + high) / 2.0;
            // Seed rank falls as the rating rises
            if seed_rank(mid, opponents) > target_rank {
                low = mid;
            } else {
                high = mid;
            }
        }
        (low + high) / 2.0
    }
}

impl Default for InversionStrategy {
    fn default() -> Self {
        Self::new(InversionSettings::default())
    }
}

impl RatingDeltaStrategy for InversionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Inversion
    }

    fn rating_delta(&self, input: &DeltaInput<'_>) -> Result<Rating> {
        if input.status == FinishStatus::Dns || input.finisher_opponents.is_empty() {
            return Ok(0);
        }

        let rating = input.rating as f64;
        let seed = seed_rank(rating, input.finisher_opponents);
        let mid_rank = (seed * input.division_ordinal).sqrt();
        let found = self.rating_for_rank(input.finisher_opponents, mid_rank, rating);

        to_points((found - rating) * input.race_type_multiplier, input)
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "inversion",
            "min_rating": self.settings.min_rating,
            "max_rating": self.settings.max_rating,
            "iterations": self.settings.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(
        rating: Rating,
        status: FinishStatus,
        rank_delta: f64,
        opponents: &'a [f64],
        ordinal: f64,
    ) -> DeltaInput<'a> {
        DeltaInput {
            athlete_id: "athlete",
            rating,
            status,
            rank_delta,
            race_type_multiplier: 8.0,
            finisher_opponents: opponents,
            division_ordinal: ordinal,
        }
    }

    #[test]
    fn test_build_strategy_follows_config() {
        let mut config = RatingConfig::default();
        assert_eq!(build_strategy(&config).kind(), StrategyKind::ClosedForm);
        config.strategy = StrategyKind::Inversion;
        assert_eq!(build_strategy(&config).kind(), StrategyKind::Inversion);
        assert_eq!(build_strategy(&config).config()["type"], "inversion");
    }

    #[test]
    fn test_closed_form_signs() {
        let strategy = ClosedFormStrategy::default();
        let gain = strategy
            .rating_delta(&input(1500, FinishStatus::Ok, 0.25, &[], 1.0))
            .unwrap();
        let none = strategy
            .rating_delta(&input(1500, FinishStatus::Ok, 0.0, &[], 2.0))
            .unwrap();
        let loss = strategy
            .rating_delta(&input(1500, FinishStatus::Ok, -0.25, &[], 3.0))
            .unwrap();

        assert!(gain > 0);
        assert_eq!(none, 0);
        assert!(loss < 0);
        // Gains outweigh losses of the same size at the start rating
        assert!(gain > -loss);
    }

    #[test]
    fn test_closed_form_value() {
        let strategy = ClosedFormStrategy::default();
        let delta = strategy
            .rating_delta(&input(1500, FinishStatus::Ok, 0.25, &[], 1.0))
            .unwrap();
        let expected = 0.25 * 8.0 * (6.0 * 8.2_f64.ln() / 1.2_f64.ln()) * 1.2;
        assert_eq!(delta, expected.round() as Rating);
    }

    #[test]
    fn test_dns_is_exactly_zero() {
        let closed_form = ClosedFormStrategy::default();
        let inversion = InversionStrategy::default();
        let dns = input(1800, FinishStatus::Dns, -0.9, &[1500.0, 1600.0], 3.0);

        assert_eq!(closed_form.rating_delta(&dns).unwrap(), 0);
        assert_eq!(inversion.rating_delta(&dns).unwrap(), 0);
    }

    #[test]
    fn test_dnf_never_gains() {
        let strategy = ClosedFormStrategy::default();
        let delta = strategy
            .rating_delta(&input(1200, FinishStatus::Dnf, -0.4, &[], 5.0))
            .unwrap();
        assert!(delta < 0);
    }

    #[test]
    fn test_rating_for_rank_without_comparators_keeps_rating() {
        let strategy = InversionStrategy::default();
        assert_eq!(strategy.rating_for_rank(&[], 1.0, 1637.0), 1637.0);

        let delta = strategy
            .rating_delta(&input(1637, FinishStatus::Ok, 0.0, &[], 1.0))
            .unwrap();
        assert_eq!(delta, 0);
    }

    #[test]
    fn test_rating_for_rank_inverts_seed() {
        let strategy = InversionStrategy::default();
        let opponents = [1400.0, 1550.0, 1700.0, 1820.0];
        let target = seed_rank(1610.0, &opponents);

        let found = strategy.rating_for_rank(&opponents, target, 1500.0);
        assert!((found - 1610.0).abs() < 1e-3);
    }

    #[test]
    fn test_inversion_moves_towards_outcome() {
        let strategy = InversionStrategy::default();
        let opponents = [1500.0, 1500.0, 1500.0];

        // Seed 2.5, finished first: should gain
        let winner = strategy
            .rating_delta(&input(1500, FinishStatus::Ok, 0.2, &opponents, 1.0))
            .unwrap();
        assert!(winner > 0);

        // Finished exactly as seeded: no change
        let seeded = [1500.0];
        let expected = strategy
            .rating_delta(&input(1500, FinishStatus::Ok, 0.0, &seeded, 1.5))
            .unwrap();
        assert_eq!(expected, 0);

        // Did not finish: ordinal behind every finisher
        let dnf = strategy
            .rating_delta(&input(1500, FinishStatus::Dnf, -0.3, &opponents, 4.0))
            .unwrap();
        assert!(dnf < 0);
    }
}
