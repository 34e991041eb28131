//! The availability-matching and conflict-reconciliation core.
//!
//! `conflicts` and `slots` are pure computations over in-memory
//! snapshots; `intervals` and `events` are the only mutation entry
//! points into persisted state; `resolver` orchestrates what happens
//! when a new unavailability collides with existing commitments.

pub mod conflicts;
pub mod error;
pub mod events;
pub mod intervals;
pub mod resolver;
pub mod slots;
pub mod types;

pub use error::{ScheduleError, ScheduleResult};
