//! Records of time spent, and the categories and settings around them.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for records and settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The record ends before it starts.
    #[error("end time {end} is before start time {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The stored duration disagrees with the start and end times.
    #[error("duration {duration} does not match start and end ({expected})")]
    DurationMismatch {
        duration: TimeDelta,
        expected: TimeDelta,
    },

    /// The record has no end time.
    #[error("record is still active")]
    Unfinished,

    /// Unknown configuration key.
    #[error("unknown setting: {key}")]
    UnknownSetting { key: String },
}

/// A span of time spent on something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identifier of this record. Zero for records not yet stored.
    pub id: i64,
    /// When recording started.
    pub start: DateTime<Utc>,
    /// When recording finished. `None` while the record is still active.
    pub end: Option<DateTime<Utc>>,
    /// Time spent. Equals `end - start` for finished records.
    pub duration: TimeDelta,
    /// Category the time was spent on.
    pub category_id: i64,
    /// Free-form notes, may be empty.
    pub notes: String,
}

impl Record {
    /// Creates an active record that started at `start`.
    pub fn started_at(start: DateTime<Utc>, category_id: i64, notes: impl Into<String>) -> Self {
        Self {
            id: 0,
            start,
            end: None,
            duration: TimeDelta::zero(),
            category_id,
            notes: notes.into(),
        }
    }

    /// Creates a finished record spanning `start..end`.
    pub fn finished_at(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        category_id: i64,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            start,
            end: Some(end),
            duration: end - start,
            category_id,
            notes: notes.into(),
        }
    }

    /// Returns true when the record has an end time.
    #[must_use]
    pub const fn finished(&self) -> bool {
        self.end.is_some()
    }

    /// Time attributed to this record when aggregating.
    ///
    /// Finished records always use `end - start` rather than the stored
    /// duration. Negative spans count as zero.
    #[must_use]
    pub fn elapsed(&self) -> TimeDelta {
        let elapsed = self.end.map_or(self.duration, |end| end - self.start);
        elapsed.max(TimeDelta::zero())
    }

    /// Checks the record for inconsistencies.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let Some(end) = self.end else {
            return Ok(());
        };
        if end < self.start {
            return Err(ValidationError::EndBeforeStart {
                start: self.start,
                end,
            });
        }
        let expected = end - self.start;
        if self.duration != expected {
            return Err(ValidationError::DurationMismatch {
                duration: self.duration,
                expected,
            });
        }
        Ok(())
    }
}

/// What the time was spent on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Configuration keys persisted alongside the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    /// Category applied to new records and reports by default.
    DefaultCategory,
}

impl Setting {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultCategory => "default_category",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Setting {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default_category" => Ok(Self::DefaultCategory),
            _ => Err(ValidationError::UnknownSetting { key: s.to_string() }),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    pub default_category_id: i64,
}
