use actix_web::{web, App, HttpServer};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ranking_service::{
    config::Config,
    db::{LeaderboardStore, MetricsSource, PgLeaderboardStore, PgMetricsReader},
    jobs::{SchedulerService, RANKING_JOB},
    routes::configure_routes,
    services::{FreshnessGate, PipelineOptions, RankingPipeline},
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load config");

    info!(
        "Starting ranking-service on {}:{} (env: {})",
        config.app.host, config.app.port, config.app.env
    );

    // Database pool + schema
    let db_config = db_pool::DbConfig {
        service_name: "ranking-service".to_string(),
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..db_pool::DbConfig::default()
    };
    db_config.log_config();
    let pool = db_pool::create_pool(db_config)
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Pipeline wiring
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let metrics_reader: Arc<dyn MetricsSource> = Arc::new(PgMetricsReader::with_aggregation(
        pool.clone(),
        config.ranking.follower_aggregation,
    ));
    let leaderboard = Arc::new(PgLeaderboardStore::new(pool.clone()));
    let leaderboard_store: Arc<dyn LeaderboardStore> = leaderboard.clone();

    let pipeline = Arc::new(RankingPipeline::new(
        metrics_reader,
        leaderboard_store.clone(),
        PipelineOptions {
            leaderboard_limit: config.ranking.leaderboard_limit,
            max_concurrent_categories: config.ranking.max_concurrent_categories,
        },
        shutdown_flag.clone(),
    ));
    let freshness = Arc::new(FreshnessGate::new(leaderboard_store));
    let scheduler = Arc::new(SchedulerService::new(
        pipeline,
        freshness.clone(),
        config.ranking.staleness_hours,
        shutdown_tx.clone(),
    ));

    scheduler.schedule(RANKING_JOB, config.ranking.interval_hours);
    scheduler
        .start(RANKING_JOB)
        .expect("Failed to start ranking job");

    if config.ranking.run_on_startup {
        let startup_scheduler = scheduler.clone();
        tokio::spawn(async move {
            startup_scheduler.startup_check().await;
        });
    }

    // HTTP server
    let bind_addr = (config.app.host.clone(), config.app.port);
    let app_config = config.clone();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .app_data(web::Data::from(leaderboard.clone()))
            .app_data(web::Data::from(freshness.clone()))
            .app_data(web::Data::from(scheduler.clone()))
            .configure(configure_routes)
    })
    .bind(bind_addr)?
    .run();

    let result = server.await;

    // Let the in-flight category finish; un-started categories are skipped
    shutdown_flag.store(true, Ordering::Relaxed);
    if shutdown_tx.send(()).is_err() {
        error!("No background loops were listening for shutdown");
    }
    info!("Server shutdown complete");

    result
}
