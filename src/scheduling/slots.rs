//! Slot search: scan a rolling horizon for days where every requested
//! participant is simultaneously free.
//!
//! Admissibility is all-or-nothing: a day is offered only when the
//! exact requested window is completely clear for every participant.
//! The engine never carves sub-windows out of partially free days —
//! if someone is busy for any part of the window, the whole day is
//! rejected even when a narrower or shifted window would have worked.

use std::collections::HashMap;

use crate::scheduling::conflicts::check_busy_conflicts;
use crate::scheduling::types::{BusyInterval, DateKey, Event, MinuteOfDay, TimeSlotCandidate};

/// Find windows where all of `participant_ids` are free.
///
/// * `duration_days == 1`: the window is `[preferred_start,
///   preferred_end]` when both are given, otherwise the full day.
/// * `duration_days > 1`: preferred times are ignored; the first day
///   and each of the following `duration_days - 1` days must all be
///   clear for the same full-day window.
///
/// Candidates come back in chronological order, truncated at
/// `max_candidates` — ties break purely by earliest start date. An
/// empty result is a normal outcome, not an error.
#[allow(clippy::too_many_arguments)]
pub fn find_available_slots(
    participant_ids: &[String],
    duration_days: u32,
    search_start: DateKey,
    preferred_start: Option<MinuteOfDay>,
    preferred_end: Option<MinuteOfDay>,
    busy_by_user: &HashMap<String, Vec<BusyInterval>>,
    events: &[Event],
    horizon_days: u32,
    max_candidates: usize,
) -> Vec<TimeSlotCandidate> {
    let (window_start, window_end) = match (preferred_start, preferred_end) {
        (Some(start), Some(end)) if duration_days <= 1 => (start, end),
        _ => (MinuteOfDay::DAY_START, MinuteOfDay::DAY_END),
    };

    let mut candidates = Vec::new();
    let mut day = search_start;

    for _ in 0..horizon_days {
        if candidates.len() >= max_candidates {
            break;
        }

        if day_admissible(participant_ids, day, window_start, window_end, busy_by_user, events) {
            if duration_days > 1 {
                // Every following day must be clear for the same
                // clock window; one failure discards the whole
                // candidate — no rescheduling is attempted.
                let end_day = day.plus_days(duration_days - 1);
                let extension_clear = day
                    .succ()
                    .range_to(end_day)
                    .into_iter()
                    .all(|d| {
                        day_admissible(
                            participant_ids,
                            d,
                            window_start,
                            window_end,
                            busy_by_user,
                            events,
                        )
                    });
                if extension_clear {
                    candidates.push(TimeSlotCandidate {
                        start_date: day,
                        end_date: end_day,
                        start_minute: window_start,
                        end_minute: window_end,
                        participant_ids: participant_ids.to_vec(),
                    });
                }
            } else {
                candidates.push(TimeSlotCandidate {
                    start_date: day,
                    end_date: day,
                    start_minute: window_start,
                    end_minute: window_end,
                    participant_ids: participant_ids.to_vec(),
                });
            }
        }

        day = day.succ();
    }

    candidates
}

/// True when every participant has zero overlap between the window
/// and both their busy intervals on `day` and any event of theirs
/// whose date range covers `day`.
fn day_admissible(
    participant_ids: &[String],
    day: DateKey,
    window_start: MinuteOfDay,
    window_end: MinuteOfDay,
    busy_by_user: &HashMap<String, Vec<BusyInterval>>,
    events: &[Event],
) -> bool {
    for user_id in participant_ids {
        let busy_overlap = busy_by_user
            .get(user_id)
            .map(|intervals| {
                !check_busy_conflicts(user_id, day, day, window_start, window_end, intervals)
                    .is_empty()
            })
            .unwrap_or(false);
        if busy_overlap {
            return false;
        }

        let event_overlap = events.iter().any(|ev| {
            ev.involves(user_id) && ev.covers(day) && ev.time_overlaps(window_start, window_end)
        });
        if event_overlap {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::types::IntervalOrigin;

    fn users(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn busy(owner: &str, date: &str, start: &str, end: &str) -> BusyInterval {
        BusyInterval {
            id: format!("{owner}-{date}-{start}"),
            owner_id: owner.to_string(),
            date: date.parse().unwrap(),
            start_minute: start.parse().unwrap(),
            end_minute: end.parse().unwrap(),
            origin: IntervalOrigin::Manual,
        }
    }

    fn event(id: &str, participants: &[&str], dates: (&str, &str), times: (&str, &str)) -> Event {
        Event {
            id: id.to_string(),
            creator_id: participants[0].to_string(),
            title: format!("event {id}"),
            description: None,
            start_date: dates.0.parse().unwrap(),
            end_date: dates.1.parse().unwrap(),
            start_time: times.0.parse().unwrap(),
            end_time: times.1.parse().unwrap(),
            participant_ids: users(participants),
            confirmed_participant_ids: vec![participants[0].to_string()],
            group_id: "g1".to_string(),
        }
    }

    fn snapshot(intervals: Vec<BusyInterval>) -> HashMap<String, Vec<BusyInterval>> {
        let mut map: HashMap<String, Vec<BusyInterval>> = HashMap::new();
        for iv in intervals {
            map.entry(iv.owner_id.clone()).or_default().push(iv);
        }
        map
    }

    #[test]
    fn free_participants_get_the_first_days_of_the_horizon() {
        let slots = find_available_slots(
            &users(&["a", "b"]),
            1,
            "2025-07-01".parse().unwrap(),
            Some("14:00".parse().unwrap()),
            Some("18:00".parse().unwrap()),
            &HashMap::new(),
            &[],
            90,
            10,
        );
        assert_eq!(slots.len(), 10);
        assert_eq!(slots[0].start_date.to_string(), "2025-07-01");
        assert_eq!(slots[9].start_date.to_string(), "2025-07-10");
        assert_eq!(slots[0].start_minute.to_string(), "14:00");
        assert_eq!(slots[0].end_minute.to_string(), "18:00");
    }

    #[test]
    fn a_partially_busy_day_is_rejected_entirely() {
        // B has an event 15:00-16:00 on day 3. The whole day is
        // excluded — never offered as 14:00-15:00.
        let events = vec![event("e1", &["b"], ("2025-07-03", "2025-07-03"), ("15:00", "16:00"))];
        let slots = find_available_slots(
            &users(&["a", "b"]),
            1,
            "2025-07-01".parse().unwrap(),
            Some("14:00".parse().unwrap()),
            Some("18:00".parse().unwrap()),
            &HashMap::new(),
            &events,
            90,
            10,
        );
        assert_eq!(slots[0].start_date.to_string(), "2025-07-01");
        assert!(slots.iter().all(|s| s.start_date.to_string() != "2025-07-03"));
    }

    #[test]
    fn busy_intervals_block_a_day_like_events_do() {
        let intervals = snapshot(vec![busy("a", "2025-07-01", "09:00", "11:00")]);
        let slots = find_available_slots(
            &users(&["a"]),
            1,
            "2025-07-01".parse().unwrap(),
            Some("09:00".parse().unwrap()),
            Some("10:00".parse().unwrap()),
            &intervals,
            &[],
            90,
            10,
        );
        assert!(slots.iter().all(|s| s.start_date.to_string() != "2025-07-01"));

        // Touching boundary: 11:00-12:00 does not overlap [09:00,11:00).
        let slots = find_available_slots(
            &users(&["a"]),
            1,
            "2025-07-01".parse().unwrap(),
            Some("11:00".parse().unwrap()),
            Some("12:00".parse().unwrap()),
            &intervals,
            &[],
            90,
            10,
        );
        assert_eq!(slots[0].start_date.to_string(), "2025-07-01");
    }

    #[test]
    fn multi_day_candidates_need_every_day_clear() {
        // A is busy on day 2, so a 3-day slot can start on day 3 at
        // the earliest.
        let intervals = snapshot(vec![busy("a", "2025-07-02", "10:00", "11:00")]);
        let slots = find_available_slots(
            &users(&["a"]),
            3,
            "2025-07-01".parse().unwrap(),
            None,
            None,
            &intervals,
            &[],
            90,
            1,
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_date.to_string(), "2025-07-03");
        assert_eq!(slots[0].end_date.to_string(), "2025-07-05");
    }

    #[test]
    fn multi_day_mode_ignores_preferred_times() {
        // The preferred window would avoid the 09:00-10:00 busy
        // interval, but multi-day search uses the full day and so
        // must skip day 1.
        let intervals = snapshot(vec![busy("a", "2025-07-01", "09:00", "10:00")]);
        let slots = find_available_slots(
            &users(&["a"]),
            2,
            "2025-07-01".parse().unwrap(),
            Some("14:00".parse().unwrap()),
            Some("18:00".parse().unwrap()),
            &intervals,
            &[],
            90,
            1,
        );
        assert_eq!(slots[0].start_date.to_string(), "2025-07-02");
        assert_eq!(slots[0].start_minute, MinuteOfDay::DAY_START);
    }

    #[test]
    fn horizon_and_result_count_are_bounded() {
        let start: DateKey = "2025-07-01".parse().unwrap();
        let slots = find_available_slots(
            &users(&["a"]),
            1,
            start,
            None,
            None,
            &HashMap::new(),
            &[],
            90,
            10,
        );
        assert!(slots.len() <= 10);
        for slot in &slots {
            assert!(slot.start_date >= start);
            assert!(slot.start_date < start.plus_days(90));
        }
    }

    #[test]
    fn no_admissible_day_returns_an_empty_list() {
        // A is blocked all day, every day of the horizon.
        let intervals: Vec<BusyInterval> = "2025-07-01"
            .parse::<DateKey>()
            .unwrap()
            .range_to("2025-09-30".parse().unwrap())
            .into_iter()
            .map(|d| busy("a", &d.to_string(), "00:00", "23:59"))
            .collect();
        let slots = find_available_slots(
            &users(&["a"]),
            1,
            "2025-07-01".parse().unwrap(),
            None,
            None,
            &snapshot(intervals),
            &[],
            90,
            10,
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn returned_slots_are_conflict_free_for_every_participant() {
        use crate::scheduling::conflicts::check_event_conflicts;

        let events = vec![
            event("e1", &["a"], ("2025-07-02", "2025-07-02"), ("10:00", "12:00")),
            event("e2", &["b"], ("2025-07-04", "2025-07-05"), ("09:00", "18:00")),
        ];
        let intervals = snapshot(vec![busy("b", "2025-07-06", "10:30", "11:30")]);
        let participants = users(&["a", "b"]);

        let slots = find_available_slots(
            &participants,
            1,
            "2025-07-01".parse().unwrap(),
            Some("10:00".parse().unwrap()),
            Some("12:00".parse().unwrap()),
            &intervals,
            &events,
            90,
            10,
        );
        assert!(!slots.is_empty());

        for slot in &slots {
            for user in &participants {
                let report = check_event_conflicts(
                    user,
                    slot.start_date,
                    slot.end_date,
                    slot.start_minute,
                    slot.end_minute,
                    &events,
                    None,
                );
                assert!(!report.has_conflict, "slot {} conflicts for {user}", slot.start_date);
                let busy_hit = intervals.get(user).is_some_and(|ivs| {
                    ivs.iter()
                        .any(|iv| iv.date == slot.start_date && iv.overlaps(slot.start_minute, slot.end_minute))
                });
                assert!(!busy_hit);
            }
        }
    }
}
