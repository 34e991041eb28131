//! Connection setup and schema for the embedded document store
use std::path::Path;

use tokio_rusqlite::Connection;

/// Open the async connection used everywhere in the app. All writes
/// are serialized through this single connection which makes each
/// read-modify-write in `scheduling` single-writer by construction.
pub async fn async_db(db_path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let file = Path::new(db_path).join("rally.db");
    Connection::open(file).await
}

/// Create the schema. Safe to run repeatedly.
pub fn initialize_db(conn: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS busy_interval (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            date TEXT NOT NULL,
            start_minute INTEGER NOT NULL,
            end_minute INTEGER NOT NULL,
            -- NULL for manual intervals, the owning event id otherwise
            origin_event_id TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_busy_interval_owner_date
            ON busy_interval (owner_id, date);
        CREATE INDEX IF NOT EXISTS idx_busy_interval_event
            ON busy_interval (origin_event_id);

        CREATE TABLE IF NOT EXISTS event (
            id TEXT PRIMARY KEY,
            creator_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            start_time INTEGER NOT NULL,
            end_time INTEGER NOT NULL,
            participants TEXT NOT NULL,
            confirmed_participants TEXT NOT NULL,
            group_id TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_event_end_date ON event (end_date);

        CREATE TABLE IF NOT EXISTS domain_event (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipient_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_domain_event_recipient
            ON domain_event (recipient_id);

        CREATE TABLE IF NOT EXISTS sweeper_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            last_run_date TEXT NOT NULL
        );
        "#,
    )
}
