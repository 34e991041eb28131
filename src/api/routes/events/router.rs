//! Router for the events API

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::Path;
use axum::response::IntoResponse;
use axum::{Router, extract::State, http::StatusCode, response::Json, response::Response};

use super::public;
use crate::api::state::AppState;
use crate::scheduling::conflicts::{check_multi_participant_conflicts, summarize_conflicts};
use crate::scheduling::events::{create_event, delete_event, list_events, EventDraft};
use crate::scheduling::types::Event;

type SharedState = Arc<RwLock<AppState>>;

/// Create an event. Every participant is checked against their
/// existing commitments first; any conflict turns the request away
/// with a `409` unless `force` is set.
async fn create(
    State(state): State<SharedState>,
    Json(payload): Json<public::CreateEventRequest>,
) -> Result<Response, crate::api::public::ApiError> {
    if payload.end_date < payload.start_date || payload.end_time <= payload.start_time {
        return Ok((
            StatusCode::BAD_REQUEST,
            "end_date must not precede start_date and start_time must be before end_time",
        )
            .into_response());
    }

    let db = state.read().unwrap().db.clone();

    let mut participant_ids = payload.participant_ids.clone();
    if !participant_ids.contains(&payload.creator_id) {
        participant_ids.insert(0, payload.creator_id.clone());
    }

    if !payload.force {
        let events = list_events(&db).await?;
        let reports = check_multi_participant_conflicts(
            &participant_ids,
            payload.start_date,
            payload.end_date,
            payload.start_time,
            payload.end_time,
            &events,
            None,
        );
        if reports.values().any(|r| r.has_conflict) {
            let names: HashMap<String, String> = participant_ids
                .iter()
                .map(|id| (id.clone(), id.clone()))
                .collect();
            let response = public::EventConflictResponse {
                summary: summarize_conflicts(&reports, &names),
                reports,
            };
            return Ok((StatusCode::CONFLICT, Json(response)).into_response());
        }
    }

    let (event, _intervals) = create_event(
        &db,
        EventDraft {
            creator_id: payload.creator_id,
            title: payload.title,
            description: payload.description,
            start_date: payload.start_date,
            end_date: payload.end_date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            participant_ids,
            group_id: payload.group_id,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(public::CreateEventResponse { event }),
    )
        .into_response())
}

async fn list(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Event>>, crate::api::public::ApiError> {
    let db = state.read().unwrap().db.clone();
    let events = list_events(&db).await?;
    Ok(Json(events))
}

/// Delete an event. Deleting an event that no longer exists is fine.
async fn delete(
    State(state): State<SharedState>,
    Path(event_id): Path<String>,
) -> Result<StatusCode, crate::api::public::ApiError> {
    let db = state.read().unwrap().db.clone();
    delete_event(&db, &event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the events router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", axum::routing::post(create).get(list))
        .route("/{id}", axum::routing::delete(delete))
}
