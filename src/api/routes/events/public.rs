//! Public types for the events API
use serde::{Deserialize, Serialize};

use crate::scheduling::types::{ConflictReport, ConflictSummary, DateKey, Event, MinuteOfDay};

#[derive(Deserialize)]
pub struct CreateEventRequest {
    pub creator_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: DateKey,
    pub end_date: DateKey,
    pub start_time: MinuteOfDay,
    pub end_time: MinuteOfDay,
    pub participant_ids: Vec<String>,
    pub group_id: String,
    /// Create even when participants have conflicting events.
    #[serde(default)]
    pub force: bool,
}

#[derive(Serialize)]
pub struct CreateEventResponse {
    pub event: Event,
}

/// Returned with a `409` when any participant has a conflict and
/// `force` was not set.
#[derive(Serialize)]
pub struct EventConflictResponse {
    pub summary: ConflictSummary,
    pub reports: std::collections::HashMap<String, ConflictReport>,
}
