//! Staleness contract over the stored leaderboard
//!
//! Consulted by the scheduler (skip redundant runs) and by the read API
//! (suggest a refresh). The clock is injected so threshold edges can be
//! tested without sleeping.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::db::LeaderboardStore;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub struct FreshnessGate {
    store: Arc<dyn LeaderboardStore>,
    clock: Arc<dyn Clock>,
}

impl FreshnessGate {
    pub fn new(store: Arc<dyn LeaderboardStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn LeaderboardStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Newest `last_updated` across the leaderboard, `None` before the
    /// first successful run
    pub async fn last_update_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.store.max_last_updated().await
    }

    /// True when no leaderboard exists yet, or the newest row is at least
    /// `interval_hours` old
    pub async fn should_update(&self, interval_hours: i64) -> Result<bool> {
        match self.store.max_last_updated().await? {
            None => Ok(true),
            Some(last_updated) => {
                Ok(self.clock.now() - last_updated >= Duration::hours(interval_hours))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockLeaderboardStore;
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn gate_with(
        last_updated: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> FreshnessGate {
        let mut store = MockLeaderboardStore::new();
        store
            .expect_max_last_updated()
            .returning(move || Ok(last_updated));
        FreshnessGate::with_clock(Arc::new(store), Arc::new(FixedClock(now)))
    }

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, min, 0).unwrap()
    }

    #[tokio::test]
    async fn empty_leaderboard_is_always_stale() {
        let gate = gate_with(None, at(12, 0));
        assert!(gate.should_update(24).await.unwrap());
        assert_eq!(gate.last_update_time().await.unwrap(), None);
    }

    #[tokio::test]
    async fn fresh_run_is_not_stale() {
        let gate = gate_with(Some(at(12, 0)), at(12, 0));
        assert!(!gate.should_update(24).await.unwrap());
    }

    #[tokio::test]
    async fn thirty_minutes_is_fresh_on_one_hour_threshold() {
        let gate = gate_with(Some(at(12, 0)), at(12, 30));
        assert!(!gate.should_update(1).await.unwrap());
    }

    #[tokio::test]
    async fn sixty_one_minutes_is_stale_on_one_hour_threshold() {
        let gate = gate_with(Some(at(12, 0)), at(13, 1));
        assert!(gate.should_update(1).await.unwrap());
    }

    #[tokio::test]
    async fn threshold_boundary_counts_as_stale() {
        let gate = gate_with(Some(at(12, 0)), at(13, 0));
        assert!(gate.should_update(1).await.unwrap());
    }

    #[tokio::test]
    async fn reports_newest_update_time() {
        let newest = at(9, 15);
        let gate = gate_with(Some(newest), at(12, 0));
        assert_eq!(gate.last_update_time().await.unwrap(), Some(newest));
    }
}
