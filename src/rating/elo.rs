//! Pairwise expected-outcome model
//!
//! Standard logistic Elo win probabilities, accumulated into an expected
//! finishing position ("seed rank") against a fixed set of opponents.

use skillratings::elo::{expected_score, EloRating};

/// Probability that an athlete rated `winner` beats one rated `loser`
pub fn win_probability(winner: f64, loser: f64) -> f64 {
    let (expected, _) = expected_score(
        &EloRating { rating: winner },
        &EloRating { rating: loser },
    );
    expected
}

/// Expected 1-based finishing position of `rating` among `opponents`
///
/// `seed = 1 + Σ P(opponent beats athlete)`; lower is stronger.
pub fn seed_rank(rating: f64, opponents: &[f64]) -> f64 {
    1.0 + opponents
        .iter()
        .map(|&opponent| win_probability(opponent, rating))
        .sum::<f64>()
}

/// Seed contribution of `missing` average-strength entrants that pad a small cohort
pub fn virtual_inflation(rating: f64, start_rating: f64, missing: usize) -> f64 {
    if missing == 0 {
        return 0.0;
    }
    missing as f64 * win_probability(start_rating, rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_ratings_are_coin_flips() {
        assert_eq!(win_probability(1500.0, 1500.0), 0.5);
    }

    #[test]
    fn test_four_hundred_points_is_ten_to_one() {
        let p = win_probability(1900.0, 1500.0);
        assert!((p - 10.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_seed_rank_three_equal_entrants() {
        let seed = seed_rank(1500.0, &[1500.0, 1500.0]);
        assert_eq!(seed, 2.0);
    }

    #[test]
    fn test_seed_rank_alone_is_first() {
        assert_eq!(seed_rank(1700.0, &[]), 1.0);
    }

    #[test]
    fn test_stronger_athlete_has_lower_seed() {
        let field = [1400.0, 1500.0, 1650.0];
        assert!(seed_rank(1800.0, &field) < seed_rank(1600.0, &field));
    }

    #[test]
    fn test_virtual_inflation() {
        assert_eq!(virtual_inflation(1500.0, 1500.0, 0), 0.0);
        assert_eq!(virtual_inflation(1500.0, 1500.0, 7), 3.5);
        // A strong athlete barely loses to padded average entrants
        assert!(virtual_inflation(2300.0, 1500.0, 7) < 0.1);
    }
}
