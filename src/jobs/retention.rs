//! Retention sweeping: past manual intervals go immediately, old
//! events linger for a grace period and then go with their derived
//! intervals. Guarded to run at most once per calendar day no matter
//! how often the job ticks.

use async_trait::async_trait;
use std::time::Duration;
use tokio_rusqlite::Connection;

use super::PeriodicJob;
use crate::core::AppConfig;
use crate::scheduling::error::ScheduleResult;
use crate::scheduling::intervals::delete_manual_before;
use crate::scheduling::types::DateKey;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub manual_intervals_deleted: usize,
    pub events_deleted: usize,
    pub derived_intervals_deleted: usize,
}

#[derive(Debug)]
pub struct RetentionSweep;

#[async_trait]
impl PeriodicJob for RetentionSweep {
    fn interval(&self) -> Duration {
        // Hourly tick; the per-day guard decides whether to do work.
        Duration::from_secs(60 * 60)
    }

    async fn run_job(&self, config: &AppConfig, db: &Connection) {
        match sweep_if_due(db, DateKey::today(), config.event_retention_days).await {
            Ok(Some(stats)) => {
                tracing::info!(
                    manual_intervals = stats.manual_intervals_deleted,
                    events = stats.events_deleted,
                    derived_intervals = stats.derived_intervals_deleted,
                    "retention sweep completed"
                );
            }
            Ok(None) => {
                tracing::debug!("retention sweep already ran today, skipping");
            }
            Err(e) => {
                // Leave the guard unset so the next tick retries.
                tracing::error!("retention sweep failed: {}", e);
            }
        }
    }
}

/// Run the sweep unless it already ran today. The guard date is only
/// advanced after a successful sweep, so a failed run is retried on
/// the next tick.
pub async fn sweep_if_due(
    db: &Connection,
    today: DateKey,
    retention_days: u32,
) -> ScheduleResult<Option<SweepStats>> {
    let last_run = db
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT last_run_date FROM sweeper_state WHERE id = 1")?;
            let mut rows = stmt
                .query_map([], |row| row.get::<_, DateKey>(0))?
                .filter_map(Result::ok);
            Ok(rows.next())
        })
        .await?;
    if last_run == Some(today) {
        return Ok(None);
    }

    let stats = sweep(db, today, retention_days).await?;

    db.call(move |conn| {
        conn.execute(
            "INSERT INTO sweeper_state (id, last_run_date) VALUES (1, ?)
             ON CONFLICT (id) DO UPDATE SET last_run_date = excluded.last_run_date",
            [today],
        )?;
        Ok(())
    })
    .await?;

    Ok(Some(stats))
}

/// The sweep body, date-injected so tests control "today".
///
/// Pass 1 deletes every manual interval dated before `today` — no
/// grace period, they describe days that are over. Pass 2 deletes
/// every event whose `end_date` is more than `retention_days` in the
/// past and cascades to its derived intervals. Both passes are
/// idempotent: re-running on the same data deletes nothing.
pub async fn sweep(db: &Connection, today: DateKey, retention_days: u32) -> ScheduleResult<SweepStats> {
    let manual_intervals_deleted = delete_manual_before(db, today).await?;

    let cutoff = today.minus_days(retention_days);
    let (events_deleted, derived_intervals_deleted) = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            let expired: Vec<String> = {
                let mut stmt = tx.prepare("SELECT id FROM event WHERE end_date < ?")?;
                stmt.query_map([cutoff], |row| row.get(0))?
                    .filter_map(Result::ok)
                    .collect()
            };
            let mut derived = 0;
            for id in &expired {
                derived += tx.execute("DELETE FROM busy_interval WHERE origin_event_id = ?", [id])?;
                tx.execute("DELETE FROM event WHERE id = ?", [id])?;
            }
            tx.commit()?;
            Ok((expired.len(), derived))
        })
        .await?;

    Ok(SweepStats {
        manual_intervals_deleted,
        events_deleted,
        derived_intervals_deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{async_db, initialize_db};
    use crate::scheduling::events::{create_event, find_event, list_events, EventDraft};
    use crate::scheduling::intervals::{busy_on, upsert_manual};
    use tempfile::tempdir;

    async fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempdir().unwrap();
        let db = async_db(dir.path().to_str().unwrap()).await.unwrap();
        db.call(|conn| {
            initialize_db(conn)?;
            Ok(())
        })
        .await
        .unwrap();
        (dir, db)
    }

    fn event_on(creator: &str, dates: (&str, &str)) -> EventDraft {
        EventDraft {
            creator_id: creator.to_string(),
            title: "picnic".to_string(),
            description: None,
            start_date: dates.0.parse().unwrap(),
            end_date: dates.1.parse().unwrap(),
            start_time: "12:00".parse().unwrap(),
            end_time: "14:00".parse().unwrap(),
            participant_ids: vec![creator.to_string()],
            group_id: "g1".to_string(),
        }
    }

    #[tokio::test]
    async fn past_manual_intervals_are_deleted_without_grace() {
        let (_dir, db) = test_db().await;
        let today: DateKey = "2025-07-08".parse().unwrap();

        upsert_manual(&db, "a", "2025-07-07".parse().unwrap(), "09:00".parse().unwrap(), "10:00".parse().unwrap())
            .await
            .unwrap();
        upsert_manual(&db, "a", today, "09:00".parse().unwrap(), "10:00".parse().unwrap())
            .await
            .unwrap();

        let stats = sweep(&db, today, 30).await.unwrap();
        assert_eq!(stats.manual_intervals_deleted, 1);
        assert!(busy_on(&db, "a", "2025-07-07".parse().unwrap()).await.unwrap().is_empty());
        assert_eq!(busy_on(&db, "a", today).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn events_expire_only_after_the_retention_window() {
        let (_dir, db) = test_db().await;
        let today: DateKey = "2025-08-01".parse().unwrap();

        // Ended 31 days ago: past the 30 day window.
        let (expired, _) = create_event(&db, event_on("a", ("2025-07-01", "2025-07-01"))).await.unwrap();
        // Ended exactly 30 days ago: still inside the window.
        let (kept, _) = create_event(&db, event_on("a", ("2025-07-02", "2025-07-02"))).await.unwrap();

        let stats = sweep(&db, today, 30).await.unwrap();
        assert_eq!(stats.events_deleted, 1);
        assert_eq!(stats.derived_intervals_deleted, 1);

        assert!(find_event(&db, &expired.id).await.unwrap().is_none());
        assert!(find_event(&db, &kept.id).await.unwrap().is_some());

        // The expired event's derived interval went with it.
        assert!(busy_on(&db, "a", "2025-07-01".parse().unwrap()).await.unwrap().is_empty());
        assert_eq!(busy_on(&db, "a", "2025-07-02".parse().unwrap()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sweeping_twice_is_idempotent() {
        let (_dir, db) = test_db().await;
        let today: DateKey = "2025-08-01".parse().unwrap();
        create_event(&db, event_on("a", ("2025-06-01", "2025-06-01"))).await.unwrap();
        upsert_manual(&db, "a", "2025-07-01".parse().unwrap(), "09:00".parse().unwrap(), "10:00".parse().unwrap())
            .await
            .unwrap();

        let first = sweep(&db, today, 30).await.unwrap();
        assert_eq!(first.events_deleted, 1);
        assert_eq!(first.manual_intervals_deleted, 1);

        let second = sweep(&db, today, 30).await.unwrap();
        assert_eq!(second, SweepStats::default());
        assert!(list_events(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn the_guard_runs_the_sweep_at_most_once_per_day() {
        let (_dir, db) = test_db().await;
        let today: DateKey = "2025-08-01".parse().unwrap();

        assert!(sweep_if_due(&db, today, 30).await.unwrap().is_some());
        assert!(sweep_if_due(&db, today, 30).await.unwrap().is_none());

        // A new day unlocks it again.
        assert!(sweep_if_due(&db, today.succ(), 30).await.unwrap().is_some());
    }
}
