use anyhow::{Error, Result};
use tokio_rusqlite::Connection;

use super::models::{DomainEvent, StoredDomainEvent};

/// Append one outbox row. Takes a plain `rusqlite` connection so
/// callers can enqueue inside the same transaction as the mutation
/// the event describes.
pub fn insert_domain_event(
    conn: &rusqlite::Connection,
    recipient_id: &str,
    event: &DomainEvent,
) -> rusqlite::Result<usize> {
    let payload = serde_json::to_string(event)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.execute(
        "INSERT INTO domain_event (recipient_id, kind, payload) VALUES (?, ?, ?)",
        [recipient_id, event.kind(), payload.as_str()],
    )
}

/// Everything queued for one recipient, oldest first.
pub async fn pending_domain_events(
    db: &Connection,
    recipient_id: &str,
) -> Result<Vec<StoredDomainEvent>, Error> {
    let recipient = recipient_id.to_owned();
    let events = db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, recipient_id, payload, created_at FROM domain_event
             WHERE recipient_id = ? ORDER BY id",
        )?;
        let rows = stmt
            .query_map([recipient], |i| {
                let payload: String = i.get(2)?;
                let event: DomainEvent = serde_json::from_str(&payload).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(StoredDomainEvent {
                    id: i.get(0)?,
                    recipient_id: i.get(1)?,
                    event,
                    created_at: i.get(3)?,
                })
            })?
            .filter_map(Result::ok)
            .collect::<Vec<StoredDomainEvent>>();
        Ok(rows)
    });
    Ok(events.await?)
}
