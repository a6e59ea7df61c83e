/// Top-creator recommendation endpoints
///
/// Read endpoints serve the stored leaderboard directly and consult the
/// freshness gate for a refresh hint; they never run the pipeline. The
/// one write-ish action is the admin-gated manual trigger.
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::db::leaderboard::PgLeaderboardStore;
use crate::error::{AppError, Result};
use crate::jobs::SchedulerService;
use crate::models::TopCreator;
use crate::services::{FreshnessGate, RunSummary};

const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

fn validate_limit(query: &LeaderboardQuery, default: usize) -> Result<i64> {
    let limit = query.limit.unwrap_or(default as i64);
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between {MIN_LIMIT} and {MAX_LIMIT}, got {limit}"
        )));
    }
    Ok(limit)
}

fn require_admin(req: &HttpRequest, config: &Config) -> Result<()> {
    if let Some(expected) = &config.ranking.admin_api_key {
        let provided = req
            .headers()
            .get("x-admin-api-key")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if provided != expected {
            return Err(AppError::Authorization(
                "invalid or missing admin api key".to_string(),
            ));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct CategoryLeaderboardResponse {
    category_id: Uuid,
    count: usize,
    creators: Vec<TopCreator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
}

/// GET /api/v1/recommendations/top-creators/category/{category_id}
pub async fn get_category_top_creators(
    path: web::Path<Uuid>,
    query: web::Query<LeaderboardQuery>,
    store: web::Data<PgLeaderboardStore>,
    freshness: web::Data<FreshnessGate>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let category_id = path.into_inner();
    let limit = validate_limit(&query, config.ranking.leaderboard_limit)?;

    debug!(category_id = %category_id, limit, "Category leaderboard request");

    let creators = store.list_category(category_id, limit).await?;
    if creators.is_empty() {
        return Err(AppError::NotFound(format!(
            "no leaderboard stored for category {category_id}"
        )));
    }

    let suggestion = if freshness
        .should_update(config.ranking.staleness_hours)
        .await?
    {
        Some(
            "leaderboard is stale; POST /api/v1/recommendations/top-creators/calculate to refresh"
                .to_string(),
        )
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(CategoryLeaderboardResponse {
        category_id,
        count: creators.len(),
        creators,
        suggestion,
    }))
}

#[derive(Serialize)]
struct CategoryGroup {
    category_id: Uuid,
    count: usize,
    creators: Vec<TopCreator>,
}

#[derive(Serialize)]
struct AllLeaderboardsResponse {
    categories_count: usize,
    categories: Vec<CategoryGroup>,
}

/// GET /api/v1/recommendations/top-creators
pub async fn get_all_top_creators(
    query: web::Query<LeaderboardQuery>,
    store: web::Data<PgLeaderboardStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let limit = validate_limit(&query, config.ranking.leaderboard_limit)?;

    let rows = store.list_all(limit).await?;

    // Rows arrive ordered by (category_id, rank_position)
    let mut categories: Vec<CategoryGroup> = Vec::new();
    for row in rows {
        match categories.last_mut() {
            Some(group) if group.category_id == row.category_id => group.creators.push(row),
            _ => categories.push(CategoryGroup {
                category_id: row.category_id,
                count: 0,
                creators: vec![row],
            }),
        }
    }
    for group in &mut categories {
        group.count = group.creators.len();
    }

    Ok(HttpResponse::Ok().json(AllLeaderboardsResponse {
        categories_count: categories.len(),
        categories,
    }))
}

#[derive(Serialize)]
struct CalculateResponse {
    success: bool,
    summary: RunSummary,
}

/// POST /api/v1/recommendations/top-creators/calculate (admin only)
pub async fn calculate_top_creators(
    req: HttpRequest,
    scheduler: web::Data<SchedulerService>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    require_admin(&req, &config)?;

    let summary = scheduler.run_now().await?;
    Ok(HttpResponse::Ok().json(CalculateResponse {
        success: true,
        summary,
    }))
}

#[derive(Serialize)]
struct StatusResponse {
    last_update: Option<DateTime<Utc>>,
    should_update: bool,
    total_top_creators: i64,
    categories_count: i64,
    is_healthy: bool,
}

/// GET /api/v1/recommendations/top-creators/status
pub async fn get_ranking_status(
    store: web::Data<PgLeaderboardStore>,
    freshness: web::Data<FreshnessGate>,
    config: web::Data<Config>,
) -> Result<HttpResponse> {
    let stats = store.stats().await?;
    let last_update = freshness.last_update_time().await?;
    let should_update = freshness
        .should_update(config.ranking.staleness_hours)
        .await?;

    Ok(HttpResponse::Ok().json(StatusResponse {
        last_update,
        should_update,
        total_top_creators: stats.total_rows,
        categories_count: stats.categories_count,
        is_healthy: stats.total_rows > 0,
    }))
}
