//! Multiplier library of the closed-form strategy

use crate::config::{FinishMultipliers, RaceTypeMultipliers, ScoreMultiplierParams};
use crate::error::{RatingError, Result};
use crate::types::FinishStatus;
use serde::{Deserialize, Serialize};

/// Distance category of a race, shortest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceType {
    Supersprint,
    Sprint,
    Olympic,
    Half,
    Full,
}

impl RaceType {
    /// Match a free-text distance label by case-insensitive substring search
    ///
    /// `supersprint` is tested before `sprint`; spaces, dashes and underscores
    /// are ignored so "Super Sprint" matches too.
    pub fn from_label(label: &str) -> Result<Self> {
        let normalized: String = label
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();

        let candidates = [
            ("supersprint", RaceType::Supersprint),
            ("sprint", RaceType::Sprint),
            ("olympic", RaceType::Olympic),
            ("half", RaceType::Half),
            ("full", RaceType::Full),
        ];

        candidates
            .iter()
            .find(|(needle, _)| normalized.contains(needle))
            .map(|(_, race_type)| *race_type)
            .ok_or_else(|| RatingError::configuration(format!("invalid race type: {}", label)).into())
    }

    pub fn multiplier(self, multipliers: &RaceTypeMultipliers) -> f64 {
        match self {
            RaceType::Supersprint => multipliers.supersprint,
            RaceType::Sprint => multipliers.sprint,
            RaceType::Olympic => multipliers.olympic,
            RaceType::Half => multipliers.half,
            RaceType::Full => multipliers.full,
        }
    }
}

impl std::fmt::Display for RaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaceType::Supersprint => write!(f, "supersprint"),
            RaceType::Sprint => write!(f, "sprint"),
            RaceType::Olympic => write!(f, "olympic"),
            RaceType::Half => write!(f, "half"),
            RaceType::Full => write!(f, "full"),
        }
    }
}

/// Asymmetric damping by current rating
///
/// Gains shrink as the rating grows, losses shrink as the rating falls; both
/// bottom out at the scale constant because the argument is floored at the base.
pub fn score_multiplier(rank_delta: f64, rating: f64, params: &ScoreMultiplierParams) -> f64 {
    let base = params.base();
    if rank_delta >= 0.0 {
        let x = base.max(10.0 + base - rating / 500.0);
        params.a * x.log(base)
    } else {
        let x = base.max(10.0 + base - (4000.0 - rating) / 400.0);
        params.c * x.log(base)
    }
}

pub fn finish_multiplier(
    status: FinishStatus,
    rank_delta: f64,
    multipliers: &FinishMultipliers,
) -> f64 {
    match status {
        FinishStatus::Ok if rank_delta >= 0.0 => multipliers.finished_gain,
        FinishStatus::Ok => multipliers.finished_loss,
        FinishStatus::Dns => 0.0,
        FinishStatus::Dnf | FinishStatus::Dq => multipliers.other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_type_matching() {
        assert_eq!(RaceType::from_label("full").unwrap(), RaceType::Full);
        assert_eq!(
            RaceType::from_label("Ironman Full Distance").unwrap(),
            RaceType::Full
        );
        assert_eq!(RaceType::from_label("HALF").unwrap(), RaceType::Half);
        assert_eq!(RaceType::from_label("olympic").unwrap(), RaceType::Olympic);
        assert_eq!(RaceType::from_label("sprint").unwrap(), RaceType::Sprint);
        assert_eq!(
            RaceType::from_label("supersprint").unwrap(),
            RaceType::Supersprint
        );
        assert_eq!(
            RaceType::from_label("Super Sprint").unwrap(),
            RaceType::Supersprint
        );
    }

    #[test]
    fn test_unknown_race_type_is_configuration_error() {
        let err = RaceType::from_label("aquathlon").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_race_type_multipliers_are_monotone() {
        let multipliers = RaceTypeMultipliers::default();
        let ladder: Vec<f64> = [
            RaceType::Supersprint,
            RaceType::Sprint,
            RaceType::Olympic,
            RaceType::Half,
            RaceType::Full,
        ]
        .iter()
        .map(|race_type| race_type.multiplier(&multipliers))
        .collect();
        assert!(ladder.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_score_multiplier_gain_side() {
        let params = ScoreMultiplierParams::default();
        // 1500: x = 10 + 1.2 - 3 = 8.2
        let expected = 6.0 * 8.2_f64.ln() / 1.2_f64.ln();
        assert!((score_multiplier(0.3, 1500.0, &params) - expected).abs() < 1e-9);

        // Gains are damped for strong athletes and floored at A
        assert!(score_multiplier(0.3, 3000.0, &params) < score_multiplier(0.3, 1500.0, &params));
        assert!((score_multiplier(0.3, 6000.0, &params) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_multiplier_loss_side() {
        let params = ScoreMultiplierParams::default();
        // 1500: x = 11.2 - 2500 / 400 = 4.95
        let expected = 3.0 * 4.95_f64.ln() / 1.2_f64.ln();
        assert!((score_multiplier(-0.3, 1500.0, &params) - expected).abs() < 1e-9);

        // Losses are damped for weak athletes and floored at C
        assert!(score_multiplier(-0.3, 1000.0, &params) < score_multiplier(-0.3, 2000.0, &params));
        assert!((score_multiplier(-0.3, 0.0, &params) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_finish_multiplier() {
        let multipliers = FinishMultipliers::default();
        assert_eq!(finish_multiplier(FinishStatus::Ok, 0.0, &multipliers), 1.2);
        assert_eq!(finish_multiplier(FinishStatus::Ok, -0.1, &multipliers), 0.8);
        assert_eq!(finish_multiplier(FinishStatus::Dns, -0.1, &multipliers), 0.0);
        assert_eq!(finish_multiplier(FinishStatus::Dnf, -0.1, &multipliers), 1.0);
        assert_eq!(finish_multiplier(FinishStatus::Dq, -0.1, &multipliers), 1.0);
    }

    #[test]
    fn test_did_not_start_is_never_scaled() {
        let multipliers = FinishMultipliers {
            finished_gain: 2.0,
            finished_loss: 0.5,
            other: 3.0,
        };
        assert_eq!(finish_multiplier(FinishStatus::Dns, 0.4, &multipliers), 0.0);
        assert_eq!(finish_multiplier(FinishStatus::Dns, -0.4, &multipliers), 0.0);
        assert_eq!(finish_multiplier(FinishStatus::Dnf, -0.4, &multipliers), 3.0);
    }
}
