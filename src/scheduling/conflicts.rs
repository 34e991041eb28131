//! Conflict detection against existing event commitments.
//!
//! Pure functions over snapshots supplied by the caller — no store
//! access and no errors. Malformed dates and times must be rejected
//! before they get here.

use std::collections::HashMap;

use crate::scheduling::types::{
    BusyInterval, ConflictReport, ConflictSummary, DateKey, Event, MinuteOfDay,
};

/// Report every event of `user_id` that overlaps the proposed range
/// in both dimensions: day ranges intersect (inclusive key
/// comparison) and clock windows overlap (half-open, so an exact
/// touch is not a conflict).
///
/// `exclude_event_id` skips the event under consideration so an event
/// never conflicts with itself through its own derived intervals.
pub fn check_event_conflicts(
    user_id: &str,
    start_date: DateKey,
    end_date: DateKey,
    start_time: MinuteOfDay,
    end_time: MinuteOfDay,
    events: &[Event],
    exclude_event_id: Option<&str>,
) -> ConflictReport {
    let conflicting_events: Vec<Event> = events
        .iter()
        .filter(|ev| ev.involves(user_id))
        .filter(|ev| exclude_event_id != Some(ev.id.as_str()))
        .filter(|ev| start_date <= ev.end_date && end_date >= ev.start_date)
        .filter(|ev| ev.time_overlaps(start_time, end_time))
        .cloned()
        .collect();

    ConflictReport {
        has_conflict: !conflicting_events.is_empty(),
        conflicting_events,
    }
}

/// Report every busy interval of `user_id` inside the proposed date
/// range whose window overlaps the proposed clock window. Same
/// half-open arithmetic as the event check.
pub fn check_busy_conflicts<'a>(
    user_id: &str,
    start_date: DateKey,
    end_date: DateKey,
    start_time: MinuteOfDay,
    end_time: MinuteOfDay,
    intervals: &'a [BusyInterval],
) -> Vec<&'a BusyInterval> {
    intervals
        .iter()
        .filter(|iv| iv.owner_id == user_id)
        .filter(|iv| start_date <= iv.date && iv.date <= end_date)
        .filter(|iv| iv.overlaps(start_time, end_time))
        .collect()
}

/// Run [`check_event_conflicts`] independently for each participant.
#[allow(clippy::too_many_arguments)]
pub fn check_multi_participant_conflicts(
    participant_ids: &[String],
    start_date: DateKey,
    end_date: DateKey,
    start_time: MinuteOfDay,
    end_time: MinuteOfDay,
    events: &[Event],
    exclude_event_id: Option<&str>,
) -> HashMap<String, ConflictReport> {
    participant_ids
        .iter()
        .map(|user_id| {
            let report = check_event_conflicts(
                user_id,
                start_date,
                end_date,
                start_time,
                end_time,
                events,
                exclude_event_id,
            );
            (user_id.clone(), report)
        })
        .collect()
}

/// Aggregate per-participant reports into a user-facing summary.
/// String assembly only — no scheduling logic.
pub fn summarize_conflicts(
    reports: &HashMap<String, ConflictReport>,
    display_names: &HashMap<String, String>,
) -> ConflictSummary {
    let mut conflicting_user_ids: Vec<String> = reports
        .iter()
        .filter(|(_, report)| report.has_conflict)
        .map(|(user_id, _)| user_id.clone())
        .collect();
    conflicting_user_ids.sort();

    let has_any_conflict = !conflicting_user_ids.is_empty();
    let message = if !has_any_conflict {
        String::new()
    } else {
        let names: Vec<&str> = conflicting_user_ids
            .iter()
            .map(|id| display_names.get(id).map_or("Unknown user", |n| n.as_str()))
            .collect();
        if names.len() == 1 {
            format!("{} already has an event scheduled during this window.", names[0])
        } else {
            format!(
                "{} already have events scheduled during this window.",
                names.join(", ")
            )
        }
    };

    ConflictSummary {
        has_any_conflict,
        message,
        conflicting_user_ids,
    }
}
