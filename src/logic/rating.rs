//! Elo delta and cosmetic rank tiers.

use serde::{Deserialize, Serialize};

/// Maximum points a single match can move a rating.
pub const K_FACTOR: f64 = 32.0;

/// Expected score of a side averaging `rating` against one averaging `opponent`.
pub fn expected_score(rating: f64, opponent: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent - rating) / 400.0))
}

/// Points every winner gains and every loser loses, from the two team averages.
pub fn compute_delta(winner_avg: f64, loser_avg: f64) -> f64 {
    K_FACTOR * (1.0 - expected_score(winner_avg, loser_avg))
}

/// Named rating band, lowest first.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTier {
    Beginner,
    Apprentice,
    Intermediate,
    Advanced,
    Legend,
}

impl RankTier {
    pub fn label(self) -> &'static str {
        match self {
            RankTier::Beginner => "Beginner",
            RankTier::Apprentice => "Apprentice",
            RankTier::Intermediate => "Intermediate",
            RankTier::Advanced => "Advanced",
            RankTier::Legend => "Legend",
        }
    }
}

/// Map a rating to its tier. The last band is open-ended.
pub fn rank_tier(rating: f64) -> RankTier {
    match rating {
        r if r < 1000.0 => RankTier::Beginner,
        r if r < 1100.0 => RankTier::Apprentice,
        r if r < 1200.0 => RankTier::Intermediate,
        r if r < 1300.0 => RankTier::Advanced,
        _ => RankTier::Legend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ratings_give_half_k() {
        assert_eq!(compute_delta(1200.0, 1200.0), K_FACTOR / 2.0);
    }

    #[test]
    fn delta_stays_within_bounds() {
        for (w, l) in [(800.0, 1600.0), (1600.0, 800.0), (1200.0, 1201.0), (3000.0, 100.0)] {
            let d = compute_delta(w, l);
            assert!(d > 0.0 && d < K_FACTOR, "delta {d} for {w} vs {l}");
        }
    }

    #[test]
    fn upset_pays_more_than_expected_win() {
        assert!(compute_delta(1100.0, 1300.0) > compute_delta(1300.0, 1100.0));
        let sum = compute_delta(1100.0, 1300.0) + compute_delta(1300.0, 1100.0);
        assert!((sum - K_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(rank_tier(999.9), RankTier::Beginner);
        assert_eq!(rank_tier(1000.0), RankTier::Apprentice);
        assert_eq!(rank_tier(1150.0), RankTier::Intermediate);
        assert_eq!(rank_tier(1200.0), RankTier::Advanced);
        assert_eq!(rank_tier(1300.0), RankTier::Legend);
        assert_eq!(rank_tier(2500.0), RankTier::Legend);
    }
}
