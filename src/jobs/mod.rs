//! Background jobs. Each job is spawned in its own tokio task and
//! re-run forever on its interval.
use async_trait::async_trait;
use std::time::Duration;
use tokio_rusqlite::Connection;

use crate::core::AppConfig;

mod retention;

pub use retention::{sweep, sweep_if_due, RetentionSweep, SweepStats};

#[async_trait]
pub trait PeriodicJob: Send + Sync {
    /// Pause before the first run so startup isn't dominated by
    /// background work.
    fn startup_delay(&self, config: &AppConfig) -> Duration {
        Duration::from_secs(config.sweep_startup_delay_secs)
    }

    fn interval(&self) -> Duration;

    /// One run. Jobs handle their own errors; a failed run is logged
    /// and retried on the next tick.
    async fn run_job(&self, config: &AppConfig, db: &Connection);
}

pub fn spawn_periodic_job<J: PeriodicJob + 'static>(config: AppConfig, db: Connection, job: J) {
    tokio::spawn(async move {
        tokio::time::sleep(job.startup_delay(&config)).await;
        loop {
            job.run_job(&config, &db).await;
            tokio::time::sleep(job.interval()).await;
        }
    });
}
