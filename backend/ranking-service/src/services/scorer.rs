//! Composite scoring and ranking of creator metrics
//!
//! Scores live on a fixed-point decimal (4 fractional digits) so the same
//! inputs always produce bit-identical stored values.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{CreatorMetrics, RankedCreator};

/// Rating scale reviews are collected on
const REVIEW_SCALE: Decimal = dec!(5);

/// Weights of the composite score. Fixed at build time; must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub followers: Decimal,
    pub reviews: Decimal,
    pub collabs: Decimal,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            followers: dec!(0.5),
            reviews: dec!(0.3),
            collabs: dec!(0.2),
        }
    }
}

impl ScoreWeights {
    pub fn sum(&self) -> Decimal {
        self.followers + self.reviews + self.collabs
    }
}

/// Turns raw per-category metrics into a ranked, truncated leaderboard.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Score, sort and rank `metrics`, keeping the top `limit`.
    ///
    /// Followers and collaborations are max-normalized over the input set
    /// (0 when the set's maximum is 0); review averages are normalized by
    /// the 5-point scale. The sort is stable and compares scores only, so
    /// tied creators keep the order in which storage returned them.
    pub fn rank(&self, metrics: Vec<CreatorMetrics>, limit: usize) -> Vec<RankedCreator> {
        if metrics.is_empty() {
            return Vec::new();
        }

        let max_followers = metrics.iter().map(|m| m.follower_count).max().unwrap_or(0);
        let max_collabs = metrics.iter().map(|m| m.collab_count).max().unwrap_or(0);

        let mut ranked: Vec<RankedCreator> = metrics
            .into_iter()
            .map(|m| {
                let score = self.score(&m, max_followers, max_collabs);
                RankedCreator {
                    metrics: m,
                    score,
                    rank_position: 0,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(limit);
        for (index, entry) in ranked.iter_mut().enumerate() {
            entry.rank_position = index as i32 + 1;
        }

        ranked
    }

    fn score(&self, metrics: &CreatorMetrics, max_followers: i64, max_collabs: i64) -> Decimal {
        let norm_followers = if max_followers > 0 {
            Decimal::from(metrics.follower_count) / Decimal::from(max_followers)
        } else {
            Decimal::ZERO
        };
        let norm_reviews = metrics.avg_review_score / REVIEW_SCALE;
        let norm_collabs = if max_collabs > 0 {
            Decimal::from(metrics.collab_count) / Decimal::from(max_collabs)
        } else {
            Decimal::ZERO
        };

        (self.weights.followers * norm_followers
            + self.weights.reviews * norm_reviews
            + self.weights.collabs * norm_collabs)
            .round_dp(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn metrics(followers: i64, avg_review: Decimal, collabs: i64) -> CreatorMetrics {
        CreatorMetrics {
            creator_id: Uuid::new_v4(),
            follower_count: followers,
            avg_review_score: avg_review,
            collab_count: collabs,
        }
    }

    #[test]
    fn weights_sum_to_one() {
        assert_eq!(ScoreWeights::default().sum(), dec!(1.0));
    }

    #[test]
    fn known_two_creator_category_scores_exactly() {
        // A: 1000 followers, 4.0 avg rating, 2 completed collabs
        // B:  500 followers, 5.0 avg rating, 0 completed collabs
        let a = metrics(1000, dec!(4.0), 2);
        let b = metrics(500, dec!(5.0), 0);
        let a_id = a.creator_id;
        let b_id = b.creator_id;

        let ranked = Scorer::new().rank(vec![a, b], 2);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].metrics.creator_id, a_id);
        assert_eq!(ranked[0].score, dec!(0.94));
        assert_eq!(ranked[0].rank_position, 1);
        assert_eq!(ranked[1].metrics.creator_id, b_id);
        assert_eq!(ranked[1].score, dec!(0.55));
        assert_eq!(ranked[1].rank_position, 2);
    }

    #[test]
    fn scores_stay_within_unit_interval() {
        let inputs = vec![
            metrics(0, Decimal::ZERO, 0),
            metrics(1, dec!(0.01), 1),
            metrics(1_000_000, dec!(5.0), 500),
            metrics(999_999, dec!(4.99), 499),
        ];

        for entry in Scorer::new().rank(inputs, 10) {
            assert!(entry.score >= Decimal::ZERO, "score {} < 0", entry.score);
            assert!(entry.score <= Decimal::ONE, "score {} > 1", entry.score);
            assert!(entry.score.scale() <= 4, "score {} has too many digits", entry.score);
        }
    }

    #[test]
    fn best_creator_on_every_axis_scores_one() {
        let top = metrics(100, dec!(5.0), 10);
        let other = metrics(50, dec!(2.5), 5);

        let ranked = Scorer::new().rank(vec![top, other], 2);
        assert_eq!(ranked[0].score, dec!(1.0));
    }

    #[test]
    fn all_zero_metrics_score_zero_without_dividing() {
        let ranked = Scorer::new().rank(
            vec![metrics(0, Decimal::ZERO, 0), metrics(0, Decimal::ZERO, 0)],
            5,
        );
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|e| e.score == Decimal::ZERO));
    }

    #[test]
    fn ties_keep_storage_read_order() {
        let first = metrics(100, dec!(3.0), 1);
        let second = metrics(100, dec!(3.0), 1);
        let third = metrics(100, dec!(3.0), 1);
        let ids: Vec<Uuid> = [&first, &second, &third]
            .iter()
            .map(|m| m.creator_id)
            .collect();

        let ranked = Scorer::new().rank(vec![first, second, third], 3);

        let ranked_ids: Vec<Uuid> = ranked.iter().map(|e| e.metrics.creator_id).collect();
        assert_eq!(ranked_ids, ids);
        assert_eq!(
            ranked.iter().map(|e| e.rank_position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn truncates_to_limit_with_dense_ranks() {
        let inputs = (1..=8)
            .map(|i| metrics(i * 100, dec!(4.0), i))
            .collect::<Vec<_>>();

        let ranked = Scorer::new().rank(inputs, 5);

        assert_eq!(ranked.len(), 5);
        assert_eq!(
            ranked.iter().map(|e| e.rank_position).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        // Descending by score, no gaps in positions
        for pair in ranked.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(Scorer::new().rank(Vec::new(), 5).is_empty());
    }

    #[test]
    fn rerunning_same_inputs_is_bit_identical() {
        let build = || {
            vec![
                CreatorMetrics {
                    creator_id: Uuid::nil(),
                    follower_count: 12345,
                    avg_review_score: dec!(3.37),
                    collab_count: 7,
                },
                CreatorMetrics {
                    creator_id: Uuid::from_u128(1),
                    follower_count: 54321,
                    avg_review_score: dec!(4.12),
                    collab_count: 3,
                },
            ]
        };

        let first = Scorer::new().rank(build(), 5);
        let second = Scorer::new().rank(build(), 5);
        assert_eq!(first, second);
    }
}
