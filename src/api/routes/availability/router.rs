//! Router for the availability API

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::Path;
use axum::response::IntoResponse;
use axum::{Router, extract::State, http::StatusCode, response::Json, response::Response};
use axum_extra::extract::Query;

use super::public;
use crate::api::state::AppState;
use crate::scheduling::events::list_events;
use crate::scheduling::intervals::{busy_on, delete_manual};
use crate::scheduling::resolver::{UnavailabilityDraft, UnavailabilityFlow};
use crate::scheduling::types::ConflictReport;
use crate::scheduling::conflicts::summarize_conflicts;

type SharedState = Arc<RwLock<AppState>>;

/// Declare an unavailability window. Conflicting events require a
/// second, confirmed request; confirming removes the owner from each
/// conflicting event before the manual intervals are written.
async fn declare_unavailability(
    State(state): State<SharedState>,
    Json(payload): Json<public::DeclareUnavailabilityRequest>,
) -> Result<Response, crate::api::public::ApiError> {
    if payload.end_date < payload.start_date || payload.end_time <= payload.start_time {
        return Ok((
            StatusCode::BAD_REQUEST,
            "end_date must not precede start_date and start_time must be before end_time",
        )
            .into_response());
    }

    let db = state.read().unwrap().db.clone();

    let events = list_events(&db).await?;
    let mut flow = UnavailabilityFlow::new(UnavailabilityDraft {
        owner_id: payload.owner_id.clone(),
        start_date: payload.start_date,
        end_date: payload.end_date,
        start_minute: payload.start_time,
        end_minute: payload.end_time,
        exclude_event_id: payload.exclude_event_id,
    });

    let conflicts = flow.check(&events)?.to_vec();
    if !conflicts.is_empty() {
        if !payload.confirmed {
            let reports = HashMap::from([(
                payload.owner_id.clone(),
                ConflictReport {
                    has_conflict: true,
                    conflicting_events: conflicts.clone(),
                },
            )]);
            // No user directory here: ids double as display names.
            let names =
                HashMap::from([(payload.owner_id.clone(), payload.owner_id.clone())]);
            let response = public::ConflictResponse {
                summary: summarize_conflicts(&reports, &names),
                conflicting_event_ids: conflicts.iter().map(|ev| ev.id.clone()).collect(),
            };
            return Ok((StatusCode::CONFLICT, Json(response)).into_response());
        }
        flow.confirm(&db).await?;
    }

    let intervals = flow.commit(&db).await?;
    Ok(Json(public::DeclareUnavailabilityResponse { intervals }).into_response())
}

/// All busy intervals for one owner on one day.
async fn get_availability(
    State(state): State<SharedState>,
    Query(params): Query<public::AvailabilityQuery>,
) -> Result<Json<Vec<crate::scheduling::types::BusyInterval>>, crate::api::public::ApiError> {
    let db = state.read().unwrap().db.clone();
    let intervals = busy_on(&db, &params.owner_id, params.date).await?;
    Ok(Json(intervals))
}

/// Remove one manual interval. Idempotent.
async fn delete_interval(
    State(state): State<SharedState>,
    Path(interval_id): Path<String>,
    Query(params): Query<public::DeleteIntervalQuery>,
) -> Result<StatusCode, crate::api::public::ApiError> {
    let db = state.read().unwrap().db.clone();
    delete_manual(&db, &params.owner_id, &interval_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the availability router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/",
            axum::routing::post(declare_unavailability).get(get_availability),
        )
        .route("/{id}", axum::routing::delete(delete_interval))
}
