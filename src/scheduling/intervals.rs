//! Persistence for busy intervals.
//!
//! Manual intervals are declared directly by their owner and merged on
//! write; event-derived intervals are synthesized from an event's
//! schedule and only ever replaced as a unit. Every read-modify-write
//! here happens inside one transaction on the single app connection,
//! so concurrent upserts serialize instead of clobbering each other.

use std::collections::HashMap;

use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::scheduling::error::ScheduleResult;
use crate::scheduling::types::{BusyInterval, DateKey, Event, IntervalOrigin, MinuteOfDay};

fn interval_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BusyInterval> {
    let origin_event_id: Option<String> = row.get(5)?;
    Ok(BusyInterval {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        date: row.get(2)?,
        start_minute: row.get(3)?,
        end_minute: row.get(4)?,
        origin: match origin_event_id {
            Some(event_id) => IntervalOrigin::EventDerived(event_id),
            None => IntervalOrigin::Manual,
        },
    })
}

const SELECT_COLUMNS: &str =
    "id, owner_id, date, start_minute, end_minute, origin_event_id";

/// Two windows coalesce when they overlap or come within one minute
/// of touching. 09:00-10:00 and 10:01-11:00 merge; a 2 minute gap
/// stays split.
fn coalesces(a_start: MinuteOfDay, a_end: MinuteOfDay, b_start: MinuteOfDay, b_end: MinuteOfDay) -> bool {
    u32::from(a_start.minutes()) <= u32::from(b_end.minutes()) + 1
        && u32::from(b_start.minutes()) <= u32::from(a_end.minutes()) + 1
}

/// Record a manual busy window for `owner_id` on `date`, absorbing
/// every existing manual interval it overlaps or touches (within one
/// minute) into a single row. Event-derived intervals on the same day
/// are never touched. Returns the owner's full interval set for that
/// day after the write.
///
/// The merge is idempotent: re-submitting a window already covered by
/// a merged interval leaves the stored set unchanged.
pub async fn upsert_manual(
    db: &Connection,
    owner_id: &str,
    date: DateKey,
    start_minute: MinuteOfDay,
    end_minute: MinuteOfDay,
) -> ScheduleResult<Vec<BusyInterval>> {
    let owner = owner_id.to_owned();
    let intervals = db
        .call(move |conn| {
            let tx = conn.transaction()?;

            let existing: Vec<BusyInterval> = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM busy_interval
                     WHERE owner_id = ? AND date = ? AND origin_event_id IS NULL"
                ))?;
                stmt.query_map(rusqlite::params![owner, date], interval_from_row)?
                    .filter_map(Result::ok)
                    .collect()
            };

            let mut merged_start = start_minute;
            let mut merged_end = end_minute;
            let mut absorbed: Vec<String> = Vec::new();
            // Intervals can chain through the new window, so grow
            // until the merged bounds stop moving.
            loop {
                let before = (merged_start, merged_end);
                for iv in &existing {
                    if !absorbed.contains(&iv.id)
                        && coalesces(merged_start, merged_end, iv.start_minute, iv.end_minute)
                    {
                        merged_start = merged_start.min(iv.start_minute);
                        merged_end = merged_end.max(iv.end_minute);
                        absorbed.push(iv.id.clone());
                    }
                }
                if (merged_start, merged_end) == before {
                    break;
                }
            }

            for id in &absorbed {
                tx.execute("DELETE FROM busy_interval WHERE id = ?", [id])?;
            }
            tx.execute(
                "INSERT INTO busy_interval (id, owner_id, date, start_minute, end_minute, origin_event_id)
                 VALUES (?, ?, ?, ?, ?, NULL)",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    owner,
                    date,
                    merged_start,
                    merged_end
                ],
            )?;

            let mut stmt = tx.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM busy_interval
                 WHERE owner_id = ? AND date = ?
                 ORDER BY start_minute"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![owner, date], interval_from_row)?
                .filter_map(Result::ok)
                .collect::<Vec<BusyInterval>>();
            drop(stmt);

            tx.commit()?;
            Ok(rows)
        })
        .await?;

    Ok(intervals)
}

/// Delete one manual interval owned by `owner_id`. Deleting an id
/// that does not exist (or belongs to someone else) is a no-op.
pub async fn delete_manual(
    db: &Connection,
    owner_id: &str,
    interval_id: &str,
) -> ScheduleResult<usize> {
    let owner = owner_id.to_owned();
    let id = interval_id.to_owned();
    let deleted = db
        .call(move |conn| {
            let count = conn.execute(
                "DELETE FROM busy_interval
                 WHERE id = ? AND owner_id = ? AND origin_event_id IS NULL",
                [id, owner],
            )?;
            Ok(count)
        })
        .await?;
    Ok(deleted)
}

/// Replace the derived intervals of `event` with a fresh synthesis:
/// one interval per participant per day of the event's range, all
/// carrying the event's clock window. Runs in one transaction and
/// returns exactly the rows written, so callers can thread the fresh
/// state into subsequent computations instead of re-reading it.
pub async fn synthesize_for_event(db: &Connection, event: &Event) -> ScheduleResult<Vec<BusyInterval>> {
    let event = event.clone();
    let written = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM busy_interval WHERE origin_event_id = ?",
                [&event.id],
            )?;

            let mut written = Vec::new();
            for day in event.start_date.range_to(event.end_date) {
                for participant in &event.participant_ids {
                    let interval = BusyInterval {
                        id: Uuid::new_v4().to_string(),
                        owner_id: participant.clone(),
                        date: day,
                        start_minute: event.start_time,
                        end_minute: event.end_time,
                        origin: IntervalOrigin::EventDerived(event.id.clone()),
                    };
                    tx.execute(
                        "INSERT INTO busy_interval (id, owner_id, date, start_minute, end_minute, origin_event_id)
                         VALUES (?, ?, ?, ?, ?, ?)",
                        rusqlite::params![
                            interval.id,
                            interval.owner_id,
                            interval.date,
                            interval.start_minute,
                            interval.end_minute,
                            event.id
                        ],
                    )?;
                    written.push(interval);
                }
            }

            tx.commit()?;
            Ok(written)
        })
        .await?;
    Ok(written)
}

/// Drop every derived interval of an event, for all participants.
pub async fn delete_for_event(db: &Connection, event_id: &str) -> ScheduleResult<usize> {
    let event_id = event_id.to_owned();
    let deleted = db
        .call(move |conn| {
            let count = conn.execute(
                "DELETE FROM busy_interval WHERE origin_event_id = ?",
                [event_id],
            )?;
            Ok(count)
        })
        .await?;
    Ok(deleted)
}

/// All intervals of one owner on one day, manual and derived,
/// ordered by start.
pub async fn busy_on(db: &Connection, owner_id: &str, date: DateKey) -> ScheduleResult<Vec<BusyInterval>> {
    let owner = owner_id.to_owned();
    let intervals = db
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM busy_interval
                 WHERE owner_id = ? AND date = ?
                 ORDER BY start_minute"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![owner, date], interval_from_row)?
                .filter_map(Result::ok)
                .collect::<Vec<BusyInterval>>();
            Ok(rows)
        })
        .await?;
    Ok(intervals)
}

/// One round trip for a slot search: every interval of every listed
/// owner inside the inclusive `[start, end]` date range, grouped by
/// owner. Owners with nothing stored get no entry.
pub async fn busy_snapshot(
    db: &Connection,
    owner_ids: &[String],
    start: DateKey,
    end: DateKey,
) -> ScheduleResult<HashMap<String, Vec<BusyInterval>>> {
    let owners = owner_ids.to_vec();
    let snapshot = db
        .call(move |conn| {
            let mut by_owner: HashMap<String, Vec<BusyInterval>> = HashMap::new();
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM busy_interval
                 WHERE owner_id = ? AND date >= ? AND date <= ?
                 ORDER BY date, start_minute"
            ))?;
            for owner in &owners {
                let rows = stmt
                    .query_map(rusqlite::params![owner, start, end], interval_from_row)?
                    .filter_map(Result::ok)
                    .collect::<Vec<BusyInterval>>();
                if !rows.is_empty() {
                    by_owner.insert(owner.clone(), rows);
                }
            }
            Ok(by_owner)
        })
        .await?;
    Ok(snapshot)
}

/// Delete manual intervals dated strictly before `today`, across all
/// owners. Derived intervals are left alone; they live and die with
/// their event. Returns the number of rows removed.
pub async fn delete_manual_before(db: &Connection, today: DateKey) -> ScheduleResult<usize> {
    let deleted = db
        .call(move |conn| {
            let count = conn.execute(
                "DELETE FROM busy_interval WHERE origin_event_id IS NULL AND date < ?",
                [today],
            )?;
            Ok(count)
        })
        .await?;
    Ok(deleted)
}
