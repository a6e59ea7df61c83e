//! Category processing and run orchestration
//!
//! One run walks every active category through read → score → replace.
//! Categories are independent: a failure in one is logged and counted,
//! never letting it abort the siblings. The whole run is guarded against
//! overlapping invocations (scheduled tick racing a manual trigger).

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::{LeaderboardStore, MetricsSource};
use crate::services::scorer::Scorer;

/// Failure of a single category, carrying enough context to log and move on
#[derive(Debug, Error)]
#[error("category {name} ({category_id}): {source}")]
pub struct CategoryError {
    pub category_id: Uuid,
    pub name: String,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a ranking run is already in progress")]
    AlreadyRunning,

    #[error("failed to list active categories: {0}")]
    CategoryFetch(#[source] anyhow::Error),
}

/// Outcome of one orchestrated run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub total_processed: usize,
    pub total_errors: usize,
    pub categories_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunSummary {
    fn empty(message: impl Into<String>) -> Self {
        Self {
            total_processed: 0,
            total_errors: 0,
            categories_count: 0,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Leaderboard rows kept per category
    pub leaderboard_limit: usize,
    /// Categories processed at once; 1 = sequential
    pub max_concurrent_categories: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            leaderboard_limit: 5,
            max_concurrent_categories: 1,
        }
    }
}

/// Processes one category end-to-end.
///
/// An empty metrics set is not an error: the stored leaderboard is still
/// replaced (with nothing), clearing rows left over from when the
/// category had qualifying creators.
struct CategoryProcessor {
    metrics: Arc<dyn MetricsSource>,
    leaderboard: Arc<dyn LeaderboardStore>,
    scorer: Scorer,
}

impl CategoryProcessor {
    async fn process(
        &self,
        category_id: Uuid,
        category_name: &str,
        limit: usize,
    ) -> std::result::Result<usize, CategoryError> {
        let fail = |source: anyhow::Error| CategoryError {
            category_id,
            name: category_name.to_string(),
            source,
        };

        let metrics = self
            .metrics
            .list_creator_metrics(category_id)
            .await
            .map_err(fail)?;

        if metrics.is_empty() {
            info!(
                category_id = %category_id,
                category = %category_name,
                "No qualifying creators, clearing stored leaderboard"
            );
        }

        let ranked = self.scorer.rank(metrics, limit);
        let stored = self
            .leaderboard
            .replace_category(category_id, &ranked)
            .await
            .map_err(|e| CategoryError {
                category_id,
                name: category_name.to_string(),
                source: e,
            })?;

        Ok(stored)
    }
}

/// Orchestrates a full top-creator recalculation across active categories.
pub struct RankingPipeline {
    metrics: Arc<dyn MetricsSource>,
    processor: Arc<CategoryProcessor>,
    options: PipelineOptions,
    shutdown: Arc<AtomicBool>,
    run_guard: Mutex<()>,
}

impl RankingPipeline {
    pub fn new(
        metrics: Arc<dyn MetricsSource>,
        leaderboard: Arc<dyn LeaderboardStore>,
        options: PipelineOptions,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let processor = Arc::new(CategoryProcessor {
            metrics: metrics.clone(),
            leaderboard,
            scorer: Scorer::new(),
        });

        Self {
            metrics,
            processor,
            options,
            shutdown,
            run_guard: Mutex::new(()),
        }
    }

    /// Recompute and store the leaderboard of every active category.
    ///
    /// Returns `AlreadyRunning` when another run holds the guard. The
    /// second caller is rejected rather than queued, so a manual trigger
    /// overlapping the scheduled tick cannot double-process categories.
    pub async fn calculate_top_creators(&self) -> std::result::Result<RunSummary, PipelineError> {
        let _guard = self.run_guard.try_lock().map_err(|_| {
            warn!("Rejecting ranking run: another run is already in progress");
            PipelineError::AlreadyRunning
        })?;

        let categories = self
            .metrics
            .list_active_categories()
            .await
            .map_err(PipelineError::CategoryFetch)?;

        if categories.is_empty() {
            info!("No active categories found, nothing to rank");
            return Ok(RunSummary::empty("No active categories found"));
        }

        let categories_count = categories.len();
        let limit = self.options.leaderboard_limit;
        info!(
            categories = categories_count,
            limit, "Starting top-creator ranking run"
        );

        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_categories));
        let mut tasks: JoinSet<(Uuid, String, std::result::Result<usize, CategoryError>)> =
            JoinSet::new();
        let mut not_started = 0usize;
        let mut aborted = false;

        for category in categories {
            if self.shutdown.load(Ordering::Relaxed) {
                aborted = true;
                not_started += 1;
                continue;
            }

            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let processor = self.processor.clone();
            tasks.spawn(async move {
                let result = processor.process(category.id, &category.name, limit).await;
                drop(permit);
                (category.id, category.name, result)
            });
        }

        if aborted {
            warn!(
                not_started,
                "Shutdown signal received, remaining categories not started"
            );
        }

        let mut total_processed = 0usize;
        let mut total_errors = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((category_id, name, Ok(stored))) => {
                    total_processed += 1;
                    info!(
                        category_id = %category_id,
                        category = %name,
                        rows = stored,
                        "Category leaderboard updated"
                    );
                }
                Ok((_, _, Err(e))) => {
                    total_errors += 1;
                    error!(
                        category_id = %e.category_id,
                        category = %e.name,
                        error = %e.source,
                        "Category processing failed, continuing with remaining categories"
                    );
                }
                Err(e) => {
                    total_errors += 1;
                    error!(error = %e, "Category task panicked");
                }
            }
        }

        let summary = RunSummary {
            total_processed,
            total_errors,
            categories_count,
            message: aborted.then(|| {
                format!("Run aborted by shutdown signal; {not_started} categories not started")
            }),
        };

        info!(
            processed = summary.total_processed,
            errors = summary.total_errors,
            categories = summary.categories_count,
            "Top-creator ranking run finished"
        );

        Ok(summary)
    }
}
