//! Persisted leaderboard repository
//!
//! The write path is a DELETE-then-bulk-INSERT inside one transaction, so
//! readers observe either the previous leaderboard or the new one, never a
//! mix. The read path backs the public recommendation endpoints.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::LeaderboardStore;
use crate::models::{RankedCreator, TopCreator};

/// Row/category totals for the status endpoint
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardStats {
    pub total_rows: i64,
    pub categories_count: i64,
}

#[derive(Clone)]
pub struct PgLeaderboardStore {
    pool: PgPool,
}

impl PgLeaderboardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stored rows for one category, best rank first
    pub async fn list_category(
        &self,
        category_id: Uuid,
        limit: i64,
    ) -> Result<Vec<TopCreator>> {
        let rows = sqlx::query_as::<_, TopCreator>(
            r#"
            SELECT id, category_id, creator_id, rank_position, score,
                   follower_count, avg_review_score, collab_count, last_updated
            FROM top_creators
            WHERE category_id = $1
            ORDER BY rank_position ASC
            LIMIT $2
            "#,
        )
        .bind(category_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("listing leaderboard for category {category_id}"))?;

        Ok(rows)
    }

    /// Top rows of every category, grouped client-side by the caller
    pub async fn list_all(&self, per_category_limit: i64) -> Result<Vec<TopCreator>> {
        let rows = sqlx::query_as::<_, TopCreator>(
            r#"
            SELECT id, category_id, creator_id, rank_position, score,
                   follower_count, avg_review_score, collab_count, last_updated
            FROM (
                SELECT *,
                       ROW_NUMBER() OVER (
                           PARTITION BY category_id
                           ORDER BY rank_position ASC
                       ) AS row_in_category
                FROM top_creators
            ) ranked
            WHERE row_in_category <= $1
            ORDER BY category_id ASC, rank_position ASC
            "#,
        )
        .bind(per_category_limit)
        .fetch_all(&self.pool)
        .await
        .context("listing all leaderboards")?;

        Ok(rows)
    }

    pub async fn stats(&self) -> Result<LeaderboardStats> {
        let (total_rows, categories_count) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COUNT(DISTINCT category_id) FROM top_creators",
        )
        .fetch_one(&self.pool)
        .await
        .context("reading leaderboard stats")?;

        Ok(LeaderboardStats {
            total_rows,
            categories_count,
        })
    }
}

#[async_trait]
impl LeaderboardStore for PgLeaderboardStore {
    async fn replace_category(
        &self,
        category_id: Uuid,
        entries: &[RankedCreator],
    ) -> Result<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("opening leaderboard transaction")?;

        sqlx::query("DELETE FROM top_creators WHERE category_id = $1")
            .bind(category_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("clearing leaderboard for category {category_id}"))?;

        if !entries.is_empty() {
            let creator_ids: Vec<Uuid> = entries.iter().map(|e| e.metrics.creator_id).collect();
            let positions: Vec<i32> = entries.iter().map(|e| e.rank_position).collect();
            let scores: Vec<Decimal> = entries.iter().map(|e| e.score).collect();
            let followers: Vec<i64> = entries.iter().map(|e| e.metrics.follower_count).collect();
            let ratings: Vec<Decimal> = entries
                .iter()
                .map(|e| e.metrics.avg_review_score.round_dp(2))
                .collect();
            let collabs: Vec<i64> = entries.iter().map(|e| e.metrics.collab_count).collect();

            sqlx::query(
                r#"
                INSERT INTO top_creators
                    (category_id, creator_id, rank_position, score,
                     follower_count, avg_review_score, collab_count, last_updated)
                SELECT $1::uuid, u.creator_id, u.rank_position, u.score,
                       u.follower_count, u.avg_review_score, u.collab_count, $8::timestamptz
                FROM unnest($2::uuid[], $3::int4[], $4::numeric[], $5::int8[], $6::numeric[], $7::int8[])
                     AS u(creator_id, rank_position, score, follower_count, avg_review_score, collab_count)
                "#,
            )
            .bind(category_id)
            .bind(&creator_ids)
            .bind(&positions)
            .bind(&scores)
            .bind(&followers)
            .bind(&ratings)
            .bind(&collabs)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .with_context(|| format!("inserting leaderboard for category {category_id}"))?;
        }

        tx.commit()
            .await
            .with_context(|| format!("committing leaderboard for category {category_id}"))?;

        debug!(
            category_id = %category_id,
            rows = entries.len(),
            "Leaderboard replaced"
        );

        Ok(entries.len())
    }

    async fn max_last_updated(&self) -> Result<Option<DateTime<Utc>>> {
        let newest = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(last_updated) FROM top_creators",
        )
        .fetch_one(&self.pool)
        .await
        .context("reading max last_updated")?;

        Ok(newest)
    }
}
