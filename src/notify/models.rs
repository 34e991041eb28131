use serde::{Deserialize, Serialize};

/// Something that happened to a schedule that other participants need
/// to hear about. Serialized into the outbox as JSON; an external
/// dispatcher owns delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DomainEvent {
    EventCreated {
        event_id: String,
        event_title: String,
        participant_ids: Vec<String>,
    },
    EventDeleted {
        event_title: String,
        participant_ids: Vec<String>,
    },
    ParticipantRemovedFromEvent {
        event_id: String,
        event_title: String,
        removed_user_id: String,
        remaining_participant_ids: Vec<String>,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::EventCreated { .. } => "EventCreated",
            DomainEvent::EventDeleted { .. } => "EventDeleted",
            DomainEvent::ParticipantRemovedFromEvent { .. } => "ParticipantRemovedFromEvent",
        }
    }
}

/// An outbox row as stored, in insertion order per recipient.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDomainEvent {
    pub id: i64,
    pub recipient_id: String,
    pub event: DomainEvent,
    pub created_at: String,
}
