//! Router for the slot search API

use std::sync::{Arc, RwLock};

use axum::{Router, extract::State, response::Json};

use super::public;
use crate::api::state::AppState;
use crate::scheduling::events::list_events;
use crate::scheduling::intervals::busy_snapshot;
use crate::scheduling::slots::find_available_slots;
use crate::scheduling::types::DateKey;

type SharedState = Arc<RwLock<AppState>>;

/// Search for windows where every listed participant is free. Runs
/// over one snapshot of the store; an empty candidate list is a
/// normal answer.
async fn search_slots(
    State(state): State<SharedState>,
    Json(payload): Json<public::SlotSearchRequest>,
) -> Result<Json<public::SlotSearchResponse>, crate::api::public::ApiError> {
    let (db, horizon_days, max_candidates) = {
        let state = state.read().unwrap();
        (
            state.db.clone(),
            state.config.horizon_days,
            state.config.max_candidates,
        )
    };

    let search_start = payload.search_start.unwrap_or_else(DateKey::today);
    // A multi-day candidate starting on the last horizon day extends
    // past it, so the snapshot has to cover those trailing days too.
    let search_end =
        search_start.plus_days(horizon_days + payload.duration_days.saturating_sub(1));

    let busy_by_user =
        busy_snapshot(&db, &payload.participant_ids, search_start, search_end).await?;
    let events = list_events(&db).await?;

    let candidates = find_available_slots(
        &payload.participant_ids,
        payload.duration_days,
        search_start,
        payload.preferred_start,
        payload.preferred_end,
        &busy_by_user,
        &events,
        horizon_days,
        max_candidates,
    );

    Ok(Json(public::SlotSearchResponse { candidates }))
}

/// Create the slots router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", axum::routing::post(search_slots))
}
