//! Domain event outbox. Mutations append rows describing what changed
//! and for whom; delivery is someone else's problem.
pub mod db;
pub mod models;

pub use db::{insert_domain_event, pending_domain_events};
pub use models::{DomainEvent, StoredDomainEvent};
