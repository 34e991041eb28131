use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
    #[error("event not found: {0}")]
    EventNotFound(String),
    /// A multi-record mutation applied some sub-writes but not
    /// others. `failed` names the records that were left untouched so
    /// the caller can retry or repair.
    #[error("{operation}: {} sub-writes failed", failed.len())]
    PartialWrite {
        operation: String,
        failed: Vec<String>,
    },
    /// An unavailability flow method was called out of order.
    #[error("flow cannot {action} from state {state}")]
    FlowTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Store(#[from] tokio_rusqlite::Error),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
