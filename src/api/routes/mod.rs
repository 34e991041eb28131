//! API routes module

pub mod availability;
pub mod events;
pub mod slots;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Unavailability declarations
        .nest("/availability", availability::router())
        // Event lifecycle
        .nest("/events", events::router())
        // Slot search
        .nest("/slots", slots::router())
}
