//! Test utilities for integration tests
#![allow(dead_code)]
use std::env;
use std::fs;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use axum::{Router, body::Body};

use rally::api::AppState;
use rally::api::app;
use rally::core::AppConfig;
use rally::core::db::async_db;
use rally::core::db::initialize_db;

/// Creates a test application router with a temporary database.
///
/// The storage directory is named by timestamp, so tests using this
/// fixture should carry `#[serial]` to avoid collisions.
pub async fn test_app() -> Router {
    test_app_and_db().await.0
}

/// Same as [`test_app`] but also hands back the connection so tests
/// can inspect or seed the store directly.
pub async fn test_app_and_db() -> (Router, tokio_rusqlite::Connection) {
    let temp_dir = env::temp_dir();
    let ts = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .to_string();
    let dir = temp_dir.join(ts);
    let db_path = dir.join("db");
    fs::create_dir_all(&db_path).expect("Failed to create db directory");

    let db = async_db(db_path.to_str().unwrap())
        .await
        .expect("Failed to connect to async db");
    db.call(|conn| {
        initialize_db(conn).expect("Failed to migrate db");
        Ok(())
    })
    .await
    .unwrap();

    let app_config = AppConfig {
        storage_path: dir.display().to_string(),
        db_path: db_path.display().to_string(),
        horizon_days: 90,
        max_candidates: 10,
        event_retention_days: 30,
        sweep_startup_delay_secs: 0,
    };
    let app_state = AppState::new(db.clone(), app_config);
    (app(Arc::new(RwLock::new(app_state))), db)
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("Response body was not utf-8")
}
