//! Event lifecycle: create, read, delete, and the roster mutation the
//! resolver leans on. Every mutation that touches more than one table
//! runs in a single transaction, with its outbox rows enqueued inside
//! the same transaction.

use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::notify::{insert_domain_event, DomainEvent};
use crate::scheduling::error::{ScheduleError, ScheduleResult};
use crate::scheduling::intervals::synthesize_for_event;
use crate::scheduling::types::{BusyInterval, DateKey, Event, MinuteOfDay};

/// What a caller supplies to create an event. The creator is always a
/// participant whether or not they listed themselves.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateKey,
    pub end_date: DateKey,
    pub start_time: MinuteOfDay,
    pub end_time: MinuteOfDay,
    pub participant_ids: Vec<String>,
    pub group_id: String,
}

const SELECT_COLUMNS: &str = "id, creator_id, title, description, start_date, end_date, \
     start_time, end_time, participants, confirmed_participants, group_id";

fn event_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let json_column = |idx: usize, raw: String| {
        serde_json::from_str::<Vec<String>>(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    };
    Ok(Event {
        id: row.get(0)?,
        creator_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        participant_ids: json_column(8, row.get(8)?)?,
        confirmed_participant_ids: json_column(9, row.get(9)?)?,
        group_id: row.get(10)?,
    })
}

fn roster_json(ids: &[String]) -> rusqlite::Result<String> {
    serde_json::to_string(ids).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Insert the event and queue `EventCreated` for every participant
/// other than the creator, then synthesize its derived busy
/// intervals. Returns the stored event together with the freshly
/// written intervals so callers can feed them straight into conflict
/// checks without re-reading the store.
pub async fn create_event(
    db: &Connection,
    draft: EventDraft,
) -> ScheduleResult<(Event, Vec<BusyInterval>)> {
    let mut participant_ids = draft.participant_ids.clone();
    if !participant_ids.contains(&draft.creator_id) {
        participant_ids.insert(0, draft.creator_id.clone());
    }
    let event = Event {
        id: Uuid::new_v4().to_string(),
        title: draft.title,
        description: draft.description,
        start_date: draft.start_date,
        end_date: draft.end_date,
        start_time: draft.start_time,
        end_time: draft.end_time,
        // Creating an event is the creator's confirmation.
        confirmed_participant_ids: vec![draft.creator_id.clone()],
        creator_id: draft.creator_id,
        participant_ids,
        group_id: draft.group_id,
    };

    let stored = event.clone();
    db.call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO event (id, creator_id, title, description, start_date, end_date,
                                start_time, end_time, participants, confirmed_participants, group_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            rusqlite::params![
                stored.id,
                stored.creator_id,
                stored.title,
                stored.description,
                stored.start_date,
                stored.end_date,
                stored.start_time,
                stored.end_time,
                roster_json(&stored.participant_ids)?,
                roster_json(&stored.confirmed_participant_ids)?,
                stored.group_id
            ],
        )?;

        let notification = DomainEvent::EventCreated {
            event_id: stored.id.clone(),
            event_title: stored.title.clone(),
            participant_ids: stored.participant_ids.clone(),
        };
        for participant in &stored.participant_ids {
            if participant != &stored.creator_id {
                insert_domain_event(&tx, participant, &notification)?;
            }
        }

        tx.commit()?;
        Ok(())
    })
    .await?;

    let intervals = synthesize_for_event(db, &event).await?;
    Ok((event, intervals))
}

pub async fn find_event(db: &Connection, event_id: &str) -> ScheduleResult<Option<Event>> {
    let id = event_id.to_owned();
    let event = db
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM event WHERE id = ?"))?;
            let mut rows = stmt
                .query_map([id], event_from_row)?
                .filter_map(Result::ok);
            Ok(rows.next())
        })
        .await?;
    Ok(event)
}

/// The full event snapshot the detectors and slot search run against.
pub async fn list_events(db: &Connection) -> ScheduleResult<Vec<Event>> {
    let events = db
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM event ORDER BY start_date"
            ))?;
            let rows = stmt
                .query_map([], event_from_row)?
                .filter_map(Result::ok)
                .collect::<Vec<Event>>();
            Ok(rows)
        })
        .await?;
    Ok(events)
}

/// Delete an event, its derived intervals, and queue `EventDeleted`
/// for every participant other than the creator — all in one
/// transaction. A missing event is nothing to do, not an error.
/// Returns whether anything was deleted.
pub async fn delete_event(db: &Connection, event_id: &str) -> ScheduleResult<bool> {
    let id = event_id.to_owned();
    let deleted = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = {
                let mut stmt =
                    tx.prepare(&format!("SELECT {SELECT_COLUMNS} FROM event WHERE id = ?"))?;
                let mut rows = stmt.query_map([&id], event_from_row)?.filter_map(Result::ok);
                rows.next()
            };
            let Some(event) = existing else {
                return Ok(false);
            };

            tx.execute("DELETE FROM event WHERE id = ?", [&id])?;
            tx.execute("DELETE FROM busy_interval WHERE origin_event_id = ?", [&id])?;

            let notification = DomainEvent::EventDeleted {
                event_title: event.title.clone(),
                participant_ids: event.participant_ids.clone(),
            };
            for participant in &event.participant_ids {
                if participant != &event.creator_id {
                    insert_domain_event(&tx, participant, &notification)?;
                }
            }

            tx.commit()?;
            Ok(true)
        })
        .await?;
    Ok(deleted)
}

/// Remove one user from an event's rosters, drop their derived
/// intervals for it, and queue `ParticipantRemovedFromEvent` for each
/// remaining participant. The removed user is not self-notified. One
/// transaction; the event itself survives even if the roster empties.
pub async fn remove_participant(
    db: &Connection,
    event_id: &str,
    user_id: &str,
) -> ScheduleResult<Event> {
    let id = event_id.to_owned();
    let user = user_id.to_owned();
    let updated = db
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = {
                let mut stmt =
                    tx.prepare(&format!("SELECT {SELECT_COLUMNS} FROM event WHERE id = ?"))?;
                let mut rows = stmt.query_map([&id], event_from_row)?.filter_map(Result::ok);
                rows.next()
            };
            let Some(mut event) = existing else {
                return Ok(None);
            };

            event.participant_ids.retain(|p| p != &user);
            event.confirmed_participant_ids.retain(|p| p != &user);
            tx.execute(
                "UPDATE event SET participants = ?, confirmed_participants = ? WHERE id = ?",
                rusqlite::params![
                    roster_json(&event.participant_ids)?,
                    roster_json(&event.confirmed_participant_ids)?,
                    event.id
                ],
            )?;
            tx.execute(
                "DELETE FROM busy_interval WHERE origin_event_id = ? AND owner_id = ?",
                [&event.id, &user],
            )?;

            let notification = DomainEvent::ParticipantRemovedFromEvent {
                event_id: event.id.clone(),
                event_title: event.title.clone(),
                removed_user_id: user.clone(),
                remaining_participant_ids: event.participant_ids.clone(),
            };
            for participant in &event.participant_ids {
                insert_domain_event(&tx, participant, &notification)?;
            }

            tx.commit()?;
            Ok(Some(event))
        })
        .await?;
    updated.ok_or_else(|| ScheduleError::EventNotFound(event_id.to_string()))
}
