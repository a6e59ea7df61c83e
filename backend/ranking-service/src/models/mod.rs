//! Domain types for the top-creator ranking pipeline
//!
//! The marketplace tables (categories, creators, users, reviews, contracts)
//! are owned by the main API; this service only reads them. The one table
//! owned here is `top_creators`, the persisted leaderboard.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A content category, as stored by the main API
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

/// One entry of a creator's `social_media` JSONB array.
///
/// The profile editor historically wrote `followers` as either a number or
/// a numeric string, so the field is decoded leniently here, at the
/// data-access boundary, instead of inside scoring code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialMediaEntry {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub followers: Option<Value>,
}

impl SocialMediaEntry {
    /// Follower count of this entry; anything non-numeric counts as 0.
    pub fn follower_count(&self) -> i64 {
        let count = match &self.followers {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse::<i64>().unwrap_or(0),
            _ => 0,
        };
        count.max(0)
    }
}

/// How a creator's platforms are folded into a single follower count.
///
/// `PrimaryPlatform` is the historical behavior: only the first entry of
/// the social media list counts. It understates multi-platform creators,
/// but changing it would reshuffle every stored leaderboard, so the rule
/// is kept as the default and named so it can be swapped deliberately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowerAggregation {
    #[default]
    PrimaryPlatform,
    SumAllPlatforms,
}

impl std::str::FromStr for FollowerAggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary_platform" => Ok(FollowerAggregation::PrimaryPlatform),
            "sum_all_platforms" => Ok(FollowerAggregation::SumAllPlatforms),
            other => Err(format!("unknown follower aggregation: {other}")),
        }
    }
}

impl FollowerAggregation {
    pub fn follower_count(&self, entries: &[SocialMediaEntry]) -> i64 {
        match self {
            FollowerAggregation::PrimaryPlatform => {
                entries.first().map(SocialMediaEntry::follower_count).unwrap_or(0)
            }
            FollowerAggregation::SumAllPlatforms => {
                entries.iter().map(SocialMediaEntry::follower_count).sum()
            }
        }
    }
}

/// Raw ranking signals for one creator within a category.
///
/// Computed fresh on every run and discarded after scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorMetrics {
    pub creator_id: Uuid,
    pub follower_count: i64,
    /// Mean of all 1-5 review ratings; 0 when the creator has none
    pub avg_review_score: Decimal,
    /// Distinct contracts with status "Completed"
    pub collab_count: i64,
}

/// A scored creator with its final leaderboard position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCreator {
    #[serde(flatten)]
    pub metrics: CreatorMetrics,
    /// Weighted composite in [0,1], 4 fractional digits
    pub score: Decimal,
    /// 1-based, dense within a category
    pub rank_position: i32,
}

/// Persisted leaderboard row, unique on (category_id, creator_id)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopCreator {
    pub id: Uuid,
    pub category_id: Uuid,
    pub creator_id: Uuid,
    pub rank_position: i32,
    pub score: Decimal,
    pub follower_count: i64,
    pub avg_review_score: Decimal,
    pub collab_count: i64,
    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(followers: Value) -> SocialMediaEntry {
        SocialMediaEntry {
            platform: Some("instagram".to_string()),
            followers: Some(followers),
        }
    }

    #[test]
    fn follower_count_accepts_numbers_and_numeric_strings() {
        assert_eq!(entry(json!(1500)).follower_count(), 1500);
        assert_eq!(entry(json!("1500")).follower_count(), 1500);
        assert_eq!(entry(json!(" 42 ")).follower_count(), 42);
    }

    #[test]
    fn follower_count_treats_garbage_as_zero() {
        assert_eq!(entry(json!("a lot")).follower_count(), 0);
        assert_eq!(entry(json!(null)).follower_count(), 0);
        assert_eq!(entry(json!({"count": 10})).follower_count(), 0);
        assert_eq!(SocialMediaEntry::default().follower_count(), 0);
    }

    #[test]
    fn follower_count_clamps_negatives() {
        assert_eq!(entry(json!(-300)).follower_count(), 0);
    }

    #[test]
    fn primary_platform_uses_first_entry_only() {
        let entries = vec![entry(json!(1000)), entry(json!(9000))];
        assert_eq!(
            FollowerAggregation::PrimaryPlatform.follower_count(&entries),
            1000
        );
    }

    #[test]
    fn sum_all_platforms_adds_every_entry() {
        let entries = vec![entry(json!(1000)), entry(json!(9000)), entry(json!("500"))];
        assert_eq!(
            FollowerAggregation::SumAllPlatforms.follower_count(&entries),
            10500
        );
    }

    #[test]
    fn aggregation_parses_from_config_strings() {
        assert_eq!(
            "primary_platform".parse::<FollowerAggregation>().unwrap(),
            FollowerAggregation::PrimaryPlatform
        );
        assert_eq!(
            "sum_all_platforms".parse::<FollowerAggregation>().unwrap(),
            FollowerAggregation::SumAllPlatforms
        );
        assert!("all_of_them".parse::<FollowerAggregation>().is_err());
    }

    #[test]
    fn empty_social_media_list_means_zero_followers() {
        assert_eq!(FollowerAggregation::PrimaryPlatform.follower_count(&[]), 0);
        assert_eq!(FollowerAggregation::SumAllPlatforms.follower_count(&[]), 0);
    }
}
