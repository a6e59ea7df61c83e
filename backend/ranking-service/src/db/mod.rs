//! Data access for the ranking pipeline
//!
//! Two seams, kept as traits so the pipeline can be exercised against
//! mocks: `MetricsSource` (read-only view over the marketplace tables)
//! and `LeaderboardStore` (the one table this service writes).

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Category, CreatorMetrics, RankedCreator};

pub mod leaderboard;
pub mod metrics_reader;

pub use leaderboard::PgLeaderboardStore;
pub use metrics_reader::PgMetricsReader;

/// Read-only ranking signals, implemented over the main API's tables
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn list_active_categories(&self) -> Result<Vec<Category>>;

    /// Metrics for every active creator of the category whose owning user
    /// is active. Empty when the category has no qualifying creators.
    async fn list_creator_metrics(&self, category_id: Uuid) -> Result<Vec<CreatorMetrics>>;
}

/// Writer/freshness view of the persisted leaderboard
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Atomically replace the category's rows with `entries` (which may be
    /// empty, legitimately clearing the leaderboard). Returns the number
    /// of rows stored.
    async fn replace_category(
        &self,
        category_id: Uuid,
        entries: &[RankedCreator],
    ) -> Result<usize>;

    /// Newest `last_updated` across all rows, `None` before the first run
    async fn max_last_updated(&self) -> Result<Option<DateTime<Utc>>>;
}
