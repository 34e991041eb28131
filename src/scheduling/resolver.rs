//! Reconciling a new unavailability declaration with the owner's
//! existing event commitments.
//!
//! The flow is an explicit state machine. A declaration starts in
//! `Drafting`, is checked against the owner's events, and either goes
//! straight to `Committing` (no conflicts) or parks in
//! `AwaitingConfirmation` until the owner decides. Confirming walks
//! them out of each conflicting event before the manual intervals are
//! written; declining returns to `Drafting` with nothing persisted.
//! There is no failed terminal state: store errors propagate and the
//! caller retries or declines.

use tokio_rusqlite::Connection;

use crate::scheduling::conflicts::check_event_conflicts;
use crate::scheduling::error::{ScheduleError, ScheduleResult};
use crate::scheduling::events::remove_participant;
use crate::scheduling::intervals::upsert_manual;
use crate::scheduling::types::{BusyInterval, DateKey, Event, MinuteOfDay};

/// The unavailability being declared. `exclude_event_id` is set when
/// the declaration originates from editing an event, so the event
/// never conflicts with itself.
#[derive(Debug, Clone)]
pub struct UnavailabilityDraft {
    pub owner_id: String,
    pub start_date: DateKey,
    pub end_date: DateKey,
    pub start_minute: MinuteOfDay,
    pub end_minute: MinuteOfDay,
    pub exclude_event_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Drafting,
    AwaitingConfirmation,
    Committing,
    Done,
}

impl FlowState {
    fn name(&self) -> &'static str {
        match self {
            FlowState::Drafting => "Drafting",
            FlowState::AwaitingConfirmation => "AwaitingConfirmation",
            FlowState::Committing => "Committing",
            FlowState::Done => "Done",
        }
    }
}

pub struct UnavailabilityFlow {
    draft: UnavailabilityDraft,
    state: FlowState,
    conflicts: Vec<Event>,
}

impl UnavailabilityFlow {
    pub fn new(draft: UnavailabilityDraft) -> Self {
        Self {
            draft,
            state: FlowState::Drafting,
            conflicts: Vec::new(),
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// The events still standing between the draft and a commit.
    pub fn conflicts(&self) -> &[Event] {
        &self.conflicts
    }

    /// Check every date of the draft range against the owner's
    /// events. Pure over the supplied snapshot. Moves to `Committing`
    /// when clear, `AwaitingConfirmation` otherwise.
    pub fn check(&mut self, events: &[Event]) -> ScheduleResult<&[Event]> {
        if self.state != FlowState::Drafting {
            return Err(self.bad_transition("check"));
        }

        let mut conflicts: Vec<Event> = Vec::new();
        for day in self.draft.start_date.range_to(self.draft.end_date) {
            let report = check_event_conflicts(
                &self.draft.owner_id,
                day,
                day,
                self.draft.start_minute,
                self.draft.end_minute,
                events,
                self.draft.exclude_event_id.as_deref(),
            );
            for ev in report.conflicting_events {
                if !conflicts.iter().any(|c| c.id == ev.id) {
                    conflicts.push(ev);
                }
            }
        }

        self.conflicts = conflicts;
        self.state = if self.conflicts.is_empty() {
            FlowState::Committing
        } else {
            FlowState::AwaitingConfirmation
        };
        Ok(&self.conflicts)
    }

    /// The owner backs out: drop the pending conflicts and return to
    /// `Drafting`. Nothing has been persisted at this point.
    pub fn decline(&mut self) {
        self.conflicts.clear();
        self.state = FlowState::Drafting;
    }

    /// The owner accepts the consequences: leave every conflicting
    /// event, then move to `Committing`. Best-effort — one event
    /// failing does not stop the rest; the failures stay queued in
    /// `conflicts` and the flow remains in `AwaitingConfirmation` so
    /// confirm can be retried. An event deleted since the check is
    /// nothing to do and counts as resolved.
    pub async fn confirm(&mut self, db: &Connection) -> ScheduleResult<()> {
        if self.state != FlowState::AwaitingConfirmation {
            return Err(self.bad_transition("confirm"));
        }

        let mut unresolved = Vec::new();
        let mut failed_ids = Vec::new();
        for event in std::mem::take(&mut self.conflicts) {
            match remove_participant(db, &event.id, &self.draft.owner_id).await {
                Ok(_) | Err(ScheduleError::EventNotFound(_)) => {}
                Err(e) => {
                    tracing::error!(event_id = %event.id, error = %e, "failed to leave event");
                    failed_ids.push(event.id.clone());
                    unresolved.push(event);
                }
            }
        }

        if unresolved.is_empty() {
            self.state = FlowState::Committing;
            Ok(())
        } else {
            self.conflicts = unresolved;
            Err(ScheduleError::PartialWrite {
                operation: "leave conflicting events".to_string(),
                failed: failed_ids,
            })
        }
    }

    /// Persist the declaration: one manual upsert per date of the
    /// range. Returns the normalized interval sets that resulted,
    /// across all dates.
    pub async fn commit(&mut self, db: &Connection) -> ScheduleResult<Vec<BusyInterval>> {
        if self.state != FlowState::Committing {
            return Err(self.bad_transition("commit"));
        }

        let mut written = Vec::new();
        for day in self.draft.start_date.range_to(self.draft.end_date) {
            let day_set = upsert_manual(
                db,
                &self.draft.owner_id,
                day,
                self.draft.start_minute,
                self.draft.end_minute,
            )
            .await?;
            written.extend(day_set);
        }

        self.state = FlowState::Done;
        Ok(written)
    }

    fn bad_transition(&self, action: &'static str) -> ScheduleError {
        ScheduleError::FlowTransition {
            action,
            state: self.state.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{async_db, initialize_db};
    use crate::notify::{pending_domain_events, DomainEvent};
    use crate::scheduling::events::{create_event, find_event, EventDraft};
    use tempfile::tempdir;

    async fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempdir().unwrap();
        let db = async_db(dir.path().to_str().unwrap()).await.unwrap();
        db.call(|conn| {
            initialize_db(conn)?;
            Ok(())
        })
        .await
        .unwrap();
        (dir, db)
    }

    fn draft(owner: &str, dates: (&str, &str), times: (&str, &str)) -> UnavailabilityDraft {
        UnavailabilityDraft {
            owner_id: owner.to_string(),
            start_date: dates.0.parse().unwrap(),
            end_date: dates.1.parse().unwrap(),
            start_minute: times.0.parse().unwrap(),
            end_minute: times.1.parse().unwrap(),
            exclude_event_id: None,
        }
    }

    fn event_draft(creator: &str, participants: &[&str], dates: (&str, &str), times: (&str, &str)) -> EventDraft {
        EventDraft {
            creator_id: creator.to_string(),
            title: format!("{creator}'s dinner"),
            description: None,
            start_date: dates.0.parse().unwrap(),
            end_date: dates.1.parse().unwrap(),
            start_time: times.0.parse().unwrap(),
            end_time: times.1.parse().unwrap(),
            participant_ids: participants.iter().map(|s| s.to_string()).collect(),
            group_id: "g1".to_string(),
        }
    }

    #[tokio::test]
    async fn clear_check_goes_straight_to_commit() {
        let (_dir, db) = test_db().await;
        let mut flow = UnavailabilityFlow::new(draft("a", ("2025-07-08", "2025-07-09"), ("09:00", "12:00")));

        let conflicts = flow.check(&[]).unwrap();
        assert!(conflicts.is_empty());
        assert_eq!(flow.state(), FlowState::Committing);

        let written = flow.commit(&db).await.unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(flow.state(), FlowState::Done);
    }

    #[tokio::test]
    async fn conflicting_declaration_requires_confirmation_then_leaves_events() {
        let (_dir, db) = test_db().await;
        let (e1, _) = create_event(&db, event_draft("b", &["a", "b"], ("2025-07-08", "2025-07-08"), ("10:00", "12:00")))
            .await
            .unwrap();
        let (e2, _) = create_event(&db, event_draft("c", &["a", "c"], ("2025-07-09", "2025-07-09"), ("09:00", "11:00")))
            .await
            .unwrap();
        let events = crate::scheduling::events::list_events(&db).await.unwrap();

        let mut flow = UnavailabilityFlow::new(draft("a", ("2025-07-08", "2025-07-09"), ("09:00", "12:00")));
        let conflicts = flow.check(&events).unwrap().to_vec();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(flow.state(), FlowState::AwaitingConfirmation);

        flow.confirm(&db).await.unwrap();
        assert_eq!(flow.state(), FlowState::Committing);

        // A is off both rosters and their derived intervals are gone.
        let e1 = find_event(&db, &e1.id).await.unwrap().unwrap();
        let e2 = find_event(&db, &e2.id).await.unwrap().unwrap();
        assert!(!e1.involves("a"));
        assert!(!e2.involves("a"));

        let written = flow.commit(&db).await.unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|iv| iv.is_manual()));

        // Remaining participants were told.
        let b_inbox = pending_domain_events(&db, "b").await.unwrap();
        assert!(b_inbox
            .iter()
            .any(|row| matches!(row.event, DomainEvent::ParticipantRemovedFromEvent { .. })));
    }

    #[tokio::test]
    async fn decline_returns_to_drafting_with_nothing_persisted() {
        let (_dir, db) = test_db().await;
        create_event(&db, event_draft("b", &["a", "b"], ("2025-07-08", "2025-07-08"), ("10:00", "12:00")))
            .await
            .unwrap();
        let events = crate::scheduling::events::list_events(&db).await.unwrap();

        let mut flow = UnavailabilityFlow::new(draft("a", ("2025-07-08", "2025-07-08"), ("09:00", "12:00")));
        flow.check(&events).unwrap();
        assert_eq!(flow.state(), FlowState::AwaitingConfirmation);

        flow.decline();
        assert_eq!(flow.state(), FlowState::Drafting);
        assert!(flow.conflicts().is_empty());

        // Still on the event, no manual interval written.
        let events = crate::scheduling::events::list_events(&db).await.unwrap();
        assert!(events[0].involves("a"));
        let day = crate::scheduling::intervals::busy_on(&db, "a", "2025-07-08".parse().unwrap())
            .await
            .unwrap();
        assert!(day.iter().all(|iv| !iv.is_manual()));
    }

    #[tokio::test]
    async fn an_event_deleted_since_the_check_counts_as_resolved() {
        let (_dir, db) = test_db().await;
        let (event, _) = create_event(&db, event_draft("b", &["a", "b"], ("2025-07-08", "2025-07-08"), ("10:00", "12:00")))
            .await
            .unwrap();
        let events = crate::scheduling::events::list_events(&db).await.unwrap();

        let mut flow = UnavailabilityFlow::new(draft("a", ("2025-07-08", "2025-07-08"), ("09:00", "12:00")));
        flow.check(&events).unwrap();
        crate::scheduling::events::delete_event(&db, &event.id).await.unwrap();

        flow.confirm(&db).await.unwrap();
        assert_eq!(flow.state(), FlowState::Committing);
    }

    #[tokio::test]
    async fn the_excluded_event_never_conflicts_with_itself() {
        let (_dir, db) = test_db().await;
        let (event, _) = create_event(&db, event_draft("a", &["a"], ("2025-07-08", "2025-07-08"), ("10:00", "12:00")))
            .await
            .unwrap();
        let events = crate::scheduling::events::list_events(&db).await.unwrap();

        let mut flow = UnavailabilityFlow::new(UnavailabilityDraft {
            exclude_event_id: Some(event.id.clone()),
            ..draft("a", ("2025-07-08", "2025-07-08"), ("10:00", "12:00"))
        });
        assert!(flow.check(&events).unwrap().is_empty());
        assert_eq!(flow.state(), FlowState::Committing);
    }

    #[tokio::test]
    async fn out_of_order_calls_are_rejected() {
        let (_dir, db) = test_db().await;
        let mut flow = UnavailabilityFlow::new(draft("a", ("2025-07-08", "2025-07-08"), ("09:00", "10:00")));

        assert!(matches!(
            flow.confirm(&db).await.unwrap_err(),
            ScheduleError::FlowTransition { action: "confirm", .. }
        ));
        assert!(matches!(
            flow.commit(&db).await.unwrap_err(),
            ScheduleError::FlowTransition { action: "commit", .. }
        ));

        flow.check(&[]).unwrap();
        assert!(matches!(
            flow.check(&[]).unwrap_err(),
            ScheduleError::FlowTransition { action: "check", .. }
        ));
    }
}
