//! Data model for the scheduling core.
//!
//! Dates are opaque calendar-day keys with no timezone arithmetic:
//! [`DateKey`] wraps a `NaiveDate` whose ordering is identical to the
//! lexicographic ordering of zero-padded `YYYY-MM-DD` strings, so all
//! range comparisons behave exactly like string-key comparisons in
//! the store. Times of day are minutes since midnight and every busy
//! window is half-open `[start, end)` — windows that merely touch do
//! not overlap.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::scheduling::error::ScheduleError;

/// A calendar day compared as a totally-ordered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn today() -> Self {
        Self(chrono::Utc::now().date_naive())
    }

    /// The next calendar day.
    pub fn succ(&self) -> Self {
        Self(self.0.succ_opt().expect("calendar day out of range"))
    }

    pub fn minus_days(&self, days: u32) -> Self {
        Self(self.0 - chrono::Duration::days(i64::from(days)))
    }

    pub fn plus_days(&self, days: u32) -> Self {
        Self(self.0 + chrono::Duration::days(i64::from(days)))
    }

    /// Every day of the inclusive range `[self, end]`.
    pub fn range_to(&self, end: DateKey) -> Vec<DateKey> {
        let mut days = Vec::new();
        let mut day = *self;
        while day <= end {
            days.push(day);
            day = day.succ();
        }
        days
    }
}

impl FromStr for DateKey {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| ScheduleError::InvalidDate(s.to_string()))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl TryFrom<String> for DateKey {
    type Error = ScheduleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DateKey> for String {
    fn from(d: DateKey) -> Self {
        d.to_string()
    }
}

impl ToSql for DateKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.to_string().into())
    }
}

impl FromSql for DateKey {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A time of day in minutes since midnight (0..=1439), parsed from
/// and displayed as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MinuteOfDay(u16);

impl MinuteOfDay {
    pub const DAY_START: MinuteOfDay = MinuteOfDay(0);
    /// 23:59 — the full-day window used when no preferred time is given.
    pub const DAY_END: MinuteOfDay = MinuteOfDay(1439);

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < 1440).then_some(Self(minutes))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }
}

impl FromStr for MinuteOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime(s.to_string());
        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        let hours: u16 = h.parse().map_err(|_| invalid())?;
        let minutes: u16 = m.parse().map_err(|_| invalid())?;
        if hours > 23 || minutes > 59 || h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        Ok(Self(hours * 60 + minutes))
    }
}

impl fmt::Display for MinuteOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl TryFrom<String> for MinuteOfDay {
    type Error = ScheduleError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MinuteOfDay> for String {
    fn from(m: MinuteOfDay) -> Self {
        m.to_string()
    }
}

impl ToSql for MinuteOfDay {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(i64::from(self.0).into())
    }
}

impl FromSql for MinuteOfDay {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => u16::try_from(i)
                .ok()
                .and_then(Self::from_minutes)
                .ok_or(FromSqlError::OutOfRange(i)),
            other => other
                .as_str()?
                .parse()
                .map_err(|e| FromSqlError::Other(Box::new(e))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalOrigin {
    /// Declared directly by the owner.
    Manual,
    /// Synthesized from an event's schedule; deleted and recreated as
    /// a unit whenever the owning event changes.
    EventDerived(String),
}

/// A half-open `[start, end)` window on one calendar day during which
/// the owner is not available.
#[derive(Debug, Clone, Serialize)]
pub struct BusyInterval {
    pub id: String,
    pub owner_id: String,
    pub date: DateKey,
    pub start_minute: MinuteOfDay,
    pub end_minute: MinuteOfDay,
    #[serde(skip)]
    pub origin: IntervalOrigin,
}

impl BusyInterval {
    pub fn is_manual(&self) -> bool {
        self.origin == IntervalOrigin::Manual
    }

    pub fn origin_event_id(&self) -> Option<&str> {
        match &self.origin {
            IntervalOrigin::Manual => None,
            IntervalOrigin::EventDerived(id) => Some(id),
        }
    }

    /// Half-open overlap: touching at a boundary is not an overlap.
    pub fn overlaps(&self, start: MinuteOfDay, end: MinuteOfDay) -> bool {
        self.start_minute < end && self.end_minute > start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub creator_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Inclusive day range; the same clock window applies to every
    /// day in the range.
    pub start_date: DateKey,
    pub end_date: DateKey,
    pub start_time: MinuteOfDay,
    pub end_time: MinuteOfDay,
    /// Authoritative roster, creator included.
    pub participant_ids: Vec<String>,
    pub confirmed_participant_ids: Vec<String>,
    pub group_id: String,
}

impl Event {
    pub fn involves(&self, user_id: &str) -> bool {
        self.participant_ids.iter().any(|p| p == user_id)
    }

    pub fn covers(&self, date: DateKey) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn time_overlaps(&self, start: MinuteOfDay, end: MinuteOfDay) -> bool {
        self.start_time < end && self.end_time > start
    }
}

/// A proposed window where every requested participant is free.
/// Ephemeral — consumed to create an `Event`, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSlotCandidate {
    pub start_date: DateKey,
    pub end_date: DateKey,
    pub start_minute: MinuteOfDay,
    pub end_minute: MinuteOfDay,
    pub participant_ids: Vec<String>,
}

/// Result of checking one participant against a proposed range.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub conflicting_events: Vec<Event>,
}

/// Presentation-level aggregation across participants.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictSummary {
    pub has_any_conflict: bool,
    pub message: String,
    pub conflicting_user_ids: Vec<String>,
}
