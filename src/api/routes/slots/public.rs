//! Public types for the slot search API
use serde::{Deserialize, Serialize};

use crate::scheduling::types::{DateKey, MinuteOfDay, TimeSlotCandidate};

fn default_duration() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct SlotSearchRequest {
    pub participant_ids: Vec<String>,
    #[serde(default = "default_duration")]
    pub duration_days: u32,
    /// Defaults to today.
    #[serde(default)]
    pub search_start: Option<DateKey>,
    #[serde(default)]
    pub preferred_start: Option<MinuteOfDay>,
    #[serde(default)]
    pub preferred_end: Option<MinuteOfDay>,
}

#[derive(Serialize)]
pub struct SlotSearchResponse {
    pub candidates: Vec<TimeSlotCandidate>,
}
