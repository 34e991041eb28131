//! Public types for the availability API
use serde::{Deserialize, Serialize};

use crate::scheduling::types::{BusyInterval, ConflictSummary, DateKey, MinuteOfDay};

/// Declare an unavailability window over an inclusive date range.
/// Dates and times are validated during deserialization; the
/// scheduling core never sees malformed input.
#[derive(Deserialize)]
pub struct DeclareUnavailabilityRequest {
    pub owner_id: String,
    pub start_date: DateKey,
    pub end_date: DateKey,
    pub start_time: MinuteOfDay,
    pub end_time: MinuteOfDay,
    /// The owner has seen the conflicts and accepts being removed
    /// from the conflicting events.
    #[serde(default)]
    pub confirmed: bool,
    /// Set when declaring from an event edit so the event does not
    /// conflict with itself.
    #[serde(default)]
    pub exclude_event_id: Option<String>,
}

#[derive(Serialize)]
pub struct DeclareUnavailabilityResponse {
    /// The owner's normalized interval sets for the affected days.
    pub intervals: Vec<BusyInterval>,
}

/// Returned with a `409` when confirmation is required.
#[derive(Serialize)]
pub struct ConflictResponse {
    pub summary: ConflictSummary,
    pub conflicting_event_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub owner_id: String,
    pub date: DateKey,
}

#[derive(Deserialize)]
pub struct DeleteIntervalQuery {
    pub owner_id: String,
}
