//! Read-only metrics aggregation over the marketplace tables

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::MetricsSource;
use crate::models::{Category, CreatorMetrics, FollowerAggregation, SocialMediaEntry};

/// `MetricsSource` backed by the shared PostgreSQL database.
///
/// Creators are returned in `(created_at, id)` order so that score ties
/// downstream resolve the same way on every run.
#[derive(Clone)]
pub struct PgMetricsReader {
    pool: PgPool,
    aggregation: FollowerAggregation,
}

impl PgMetricsReader {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            aggregation: FollowerAggregation::default(),
        }
    }

    pub fn with_aggregation(pool: PgPool, aggregation: FollowerAggregation) -> Self {
        Self { pool, aggregation }
    }

    fn decode_social_media(&self, creator_id: Uuid, raw: Option<serde_json::Value>) -> i64 {
        let entries: Vec<SocialMediaEntry> = match raw {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!(
                    creator_id = %creator_id,
                    error = %e,
                    "Malformed social_media payload, counting 0 followers"
                );
                Vec::new()
            }),
            None => Vec::new(),
        };
        self.aggregation.follower_count(&entries)
    }
}

#[async_trait]
impl MetricsSource for PgMetricsReader {
    async fn list_active_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, is_active
            FROM categories
            WHERE is_active = TRUE
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("listing active categories")?;

        Ok(categories)
    }

    async fn list_creator_metrics(&self, category_id: Uuid) -> Result<Vec<CreatorMetrics>> {
        let rows = sqlx::query_as::<_, (Uuid, Option<serde_json::Value>, Decimal, i64)>(
            r#"
            SELECT
                c.id AS creator_id,
                c.social_media,
                COALESCE(rv.avg_rating, 0::numeric) AS avg_review_score,
                COALESCE(ct.completed_count, 0) AS collab_count
            FROM creators c
            INNER JOIN users u ON u.id = c.user_id AND u.is_active = TRUE
            LEFT JOIN (
                SELECT creator_id, ROUND(AVG(rating)::numeric, 2) AS avg_rating
                FROM reviews
                GROUP BY creator_id
            ) rv ON rv.creator_id = c.id
            LEFT JOIN (
                SELECT creator_id, COUNT(*) AS completed_count
                FROM contracts
                WHERE contract_status = 'Completed'
                GROUP BY creator_id
            ) ct ON ct.creator_id = c.id
            WHERE c.category_id = $1 AND c.is_active = TRUE
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("reading creator metrics for category {category_id}"))?;

        let metrics = rows
            .into_iter()
            .map(|(creator_id, social_media, avg_review_score, collab_count)| CreatorMetrics {
                creator_id,
                follower_count: self.decode_social_media(creator_id, social_media),
                avg_review_score,
                collab_count,
            })
            .collect();

        Ok(metrics)
    }
}
