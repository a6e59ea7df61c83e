use serde::Deserialize;
use std::env;

use crate::models::FollowerAggregation;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_env")]
    pub env: String,

    #[serde(default = "default_app_host")]
    pub host: String,

    #[serde(default = "default_app_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Leaderboard rows kept per category
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,

    /// Age beyond which the stored leaderboard counts as stale
    #[serde(default = "default_staleness_hours")]
    pub staleness_hours: i64,

    /// Cadence of the recurring ranking job
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Categories processed at once; 1 = sequential
    #[serde(default = "default_max_concurrent_categories")]
    pub max_concurrent_categories: usize,

    /// Run a freshness check (and possibly a full run) at process start
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,

    /// How a creator's social platforms fold into one follower count
    #[serde(default)]
    pub follower_aggregation: FollowerAggregation,

    /// Required on the manual-trigger endpoint when set
    #[serde(default)]
    pub admin_api_key: Option<String>,
}

// Default value functions
fn default_app_env() -> String {
    "development".to_string()
}

fn default_app_host() -> String {
    "0.0.0.0".to_string()
}

fn default_app_port() -> u16 {
    8097
}

fn default_db_max_connections() -> u32 {
    20
}

fn default_leaderboard_limit() -> usize {
    5
}

fn default_staleness_hours() -> i64 {
    24
}

fn default_interval_hours() -> u64 {
    24
}

fn default_max_concurrent_categories() -> usize {
    1
}

fn default_run_on_startup() -> bool {
    true
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();

        let app = AppConfig {
            env: env::var("APP_ENV").unwrap_or_else(|_| default_app_env()),
            host: env::var("APP_HOST").unwrap_or_else(|_| default_app_host()),
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| default_app_port().to_string())
                .parse()
                .unwrap_or(default_app_port()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| default_db_max_connections().to_string())
                .parse()
                .unwrap_or(default_db_max_connections()),
        };

        let ranking = RankingConfig {
            leaderboard_limit: env::var("RANKING_LEADERBOARD_LIMIT")
                .unwrap_or_else(|_| default_leaderboard_limit().to_string())
                .parse()
                .unwrap_or(default_leaderboard_limit()),
            staleness_hours: env::var("RANKING_STALENESS_HOURS")
                .unwrap_or_else(|_| default_staleness_hours().to_string())
                .parse()
                .unwrap_or(default_staleness_hours()),
            interval_hours: env::var("RANKING_INTERVAL_HOURS")
                .unwrap_or_else(|_| default_interval_hours().to_string())
                .parse()
                .unwrap_or(default_interval_hours()),
            max_concurrent_categories: env::var("RANKING_MAX_CONCURRENT_CATEGORIES")
                .unwrap_or_else(|_| default_max_concurrent_categories().to_string())
                .parse()
                .unwrap_or(default_max_concurrent_categories()),
            run_on_startup: env::var("RANKING_RUN_ON_STARTUP")
                .unwrap_or_else(|_| default_run_on_startup().to_string())
                .parse()
                .unwrap_or(default_run_on_startup()),
            follower_aggregation: env::var("RANKING_FOLLOWER_AGGREGATION")
                .unwrap_or_else(|_| "primary_platform".to_string())
                .parse()
                .unwrap_or_default(),
            admin_api_key: env::var("ADMIN_API_KEY").ok().filter(|k| !k.is_empty()),
        };

        Ok(Config {
            app,
            database,
            ranking,
        }
        .validated())
    }

    /// Clamp knobs that would misbehave at extreme values
    fn validated(mut self) -> Self {
        if self.ranking.leaderboard_limit == 0 {
            self.ranking.leaderboard_limit = default_leaderboard_limit();
        }
        if self.ranking.interval_hours == 0 {
            self.ranking.interval_hours = default_interval_hours();
        }
        self.ranking.max_concurrent_categories =
            self.ranking.max_concurrent_categories.clamp(1, 8);
        self
    }

    pub fn is_production(&self) -> bool {
        self.app.env == "production"
    }
}
