//! Recurring ranking job management
//!
//! `SchedulerService` owns its job handles outright: constructed once at
//! startup and injected where needed, instead of a process-global job
//! registry. Jobs move through schedule() → start() → stop()/restart();
//! a scheduled firing consults the freshness gate first and every failure
//! inside a firing is caught so the timer itself never dies.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::services::{FreshnessGate, PipelineError, RankingPipeline, RunSummary};

/// Name of the daily top-creator recalculation job
pub const RANKING_JOB: &str = "top-creator-ranking";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Registered but not running
    Scheduled,
    Running,
}

struct ScheduledJob {
    interval_hours: u64,
    handle: Option<JoinHandle<()>>,
}

pub struct SchedulerService {
    pipeline: Arc<RankingPipeline>,
    freshness: Arc<FreshnessGate>,
    staleness_hours: i64,
    shutdown: broadcast::Sender<()>,
    jobs: Mutex<HashMap<String, ScheduledJob>>,
}

impl SchedulerService {
    pub fn new(
        pipeline: Arc<RankingPipeline>,
        freshness: Arc<FreshnessGate>,
        staleness_hours: i64,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        Self {
            pipeline,
            freshness,
            staleness_hours,
            shutdown,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a named recurring job in the stopped state. Re-scheduling
    /// an existing name stops the old loop first.
    pub fn schedule(&self, name: &str, interval_hours: u64) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(previous) = jobs.insert(
            name.to_string(),
            ScheduledJob {
                interval_hours,
                handle: None,
            },
        ) {
            if let Some(handle) = previous.handle {
                warn!(job = %name, "Re-scheduling a live job, stopping previous loop");
                handle.abort();
            }
        }
        info!(job = %name, interval_hours, "Job scheduled");
    }

    /// Spawn the recurring loop for a scheduled job
    pub fn start(&self, name: &str) -> anyhow::Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("unknown job: {name}"))?;

        if job.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!(job = %name, "Job already running, start ignored");
            return Ok(());
        }

        let handle = tokio::spawn(run_scheduled_loop(
            name.to_string(),
            job.interval_hours,
            self.pipeline.clone(),
            self.freshness.clone(),
            self.staleness_hours,
            self.shutdown.subscribe(),
        ));
        job.handle = Some(handle);
        info!(job = %name, "Job started");
        Ok(())
    }

    /// Stop a running job, leaving it scheduled
    pub fn stop(&self, name: &str) -> anyhow::Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("unknown job: {name}"))?;

        match job.handle.take() {
            Some(handle) => {
                handle.abort();
                info!(job = %name, "Job stopped");
            }
            None => info!(job = %name, "Job was not running"),
        }
        Ok(())
    }

    pub fn restart(&self, name: &str) -> anyhow::Result<()> {
        self.stop(name)?;
        self.start(name)
    }

    pub fn state(&self, name: &str) -> Option<JobState> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(name).map(|job| {
            if job.handle.as_ref().is_some_and(|h| !h.is_finished()) {
                JobState::Running
            } else {
                JobState::Scheduled
            }
        })
    }

    /// Immediate run, bypassing the freshness gate. Used by the startup
    /// check and the admin trigger endpoint.
    pub async fn run_now(&self) -> Result<RunSummary, PipelineError> {
        self.pipeline.calculate_top_creators().await
    }

    /// At process start: recompute right away when no leaderboard exists
    /// yet or the stored one has gone stale.
    pub async fn startup_check(&self) {
        match self.freshness.should_update(self.staleness_hours).await {
            Ok(true) => {
                info!("Leaderboard missing or stale at startup, running initial calculation");
                match self.run_now().await {
                    Ok(summary) => info!(
                        processed = summary.total_processed,
                        errors = summary.total_errors,
                        "Startup ranking run finished"
                    ),
                    Err(e) => error!(error = %e, "Startup ranking run failed"),
                }
            }
            Ok(false) => info!("Leaderboard is fresh at startup, no initial run needed"),
            Err(e) => error!(error = %e, "Startup freshness check failed"),
        }
    }
}

async fn run_scheduled_loop(
    name: String,
    interval_hours: u64,
    pipeline: Arc<RankingPipeline>,
    freshness: Arc<FreshnessGate>,
    staleness_hours: i64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_hours * 3600));
    // The immediate first tick is consumed here; the startup check decides
    // whether an initial run happens.
    ticker.tick().await;

    info!(job = %name, interval_hours, "Job loop started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match freshness.should_update(staleness_hours).await {
                    Ok(true) => match pipeline.calculate_top_creators().await {
                        Ok(summary) => info!(
                            job = %name,
                            processed = summary.total_processed,
                            errors = summary.total_errors,
                            categories = summary.categories_count,
                            "Scheduled ranking run finished"
                        ),
                        Err(PipelineError::AlreadyRunning) => warn!(
                            job = %name,
                            "Scheduled run skipped: another run is active"
                        ),
                        Err(e) => error!(
                            job = %name,
                            error = %e,
                            "Scheduled ranking run failed, will retry on next tick"
                        ),
                    },
                    Ok(false) => info!(job = %name, "Leaderboard is fresh, skipping scheduled run"),
                    Err(e) => error!(job = %name, error = %e, "Freshness check failed, skipping run"),
                }
            }
            _ = shutdown.recv() => {
                info!(job = %name, "Received shutdown signal, stopping job loop");
                break;
            }
        }
    }

    info!(job = %name, "Job loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockLeaderboardStore, MockMetricsSource};
    use crate::services::PipelineOptions;
    use std::sync::atomic::AtomicBool;

    fn scheduler(source: MockMetricsSource, store: MockLeaderboardStore) -> SchedulerService {
        let store = Arc::new(store);
        let pipeline = Arc::new(RankingPipeline::new(
            Arc::new(source),
            store.clone(),
            PipelineOptions::default(),
            Arc::new(AtomicBool::new(false)),
        ));
        let freshness = Arc::new(FreshnessGate::new(store));
        let (shutdown_tx, _) = broadcast::channel(1);
        SchedulerService::new(pipeline, freshness, 24, shutdown_tx)
    }

    #[tokio::test]
    async fn job_lifecycle_walks_the_state_machine() {
        let scheduler = scheduler(MockMetricsSource::new(), MockLeaderboardStore::new());

        assert_eq!(scheduler.state(RANKING_JOB), None);

        scheduler.schedule(RANKING_JOB, 24);
        assert_eq!(scheduler.state(RANKING_JOB), Some(JobState::Scheduled));

        scheduler.start(RANKING_JOB).unwrap();
        assert_eq!(scheduler.state(RANKING_JOB), Some(JobState::Running));

        scheduler.stop(RANKING_JOB).unwrap();
        assert_eq!(scheduler.state(RANKING_JOB), Some(JobState::Scheduled));

        scheduler.restart(RANKING_JOB).unwrap();
        assert_eq!(scheduler.state(RANKING_JOB), Some(JobState::Running));

        scheduler.stop(RANKING_JOB).unwrap();
    }

    #[tokio::test]
    async fn starting_an_unknown_job_errors() {
        let scheduler = scheduler(MockMetricsSource::new(), MockLeaderboardStore::new());
        assert!(scheduler.start("no-such-job").is_err());
        assert!(scheduler.stop("no-such-job").is_err());
    }

    #[tokio::test]
    async fn double_start_is_a_warned_noop() {
        let scheduler = scheduler(MockMetricsSource::new(), MockLeaderboardStore::new());
        scheduler.schedule(RANKING_JOB, 24);
        scheduler.start(RANKING_JOB).unwrap();
        scheduler.start(RANKING_JOB).unwrap();
        assert_eq!(scheduler.state(RANKING_JOB), Some(JobState::Running));
        scheduler.stop(RANKING_JOB).unwrap();
    }

    #[tokio::test]
    async fn run_now_bypasses_the_gate_and_reports_the_summary() {
        let mut source = MockMetricsSource::new();
        source
            .expect_list_active_categories()
            .returning(|| Ok(Vec::new()));
        // No freshness expectation: run_now must not consult the store's
        // max_last_updated before running.
        let scheduler = scheduler(source, MockLeaderboardStore::new());

        let summary = scheduler.run_now().await.unwrap();
        assert_eq!(summary.message.as_deref(), Some("No active categories found"));
    }

    #[tokio::test]
    async fn startup_check_runs_when_no_leaderboard_exists() {
        let mut source = MockMetricsSource::new();
        source
            .expect_list_active_categories()
            .times(1)
            .returning(|| Ok(Vec::new()));
        let mut store = MockLeaderboardStore::new();
        store.expect_max_last_updated().returning(|| Ok(None));

        let scheduler = scheduler(source, store);
        scheduler.startup_check().await;
    }

    #[tokio::test]
    async fn startup_check_skips_when_fresh() {
        // list_active_categories has no expectation: a call would panic
        let mut store = MockLeaderboardStore::new();
        store
            .expect_max_last_updated()
            .returning(|| Ok(Some(chrono::Utc::now())));

        let scheduler = scheduler(MockMetricsSource::new(), store);
        scheduler.startup_check().await;
    }
}
