//! Core domain logic for myhours.
//!
//! This crate contains the fundamental types and logic for:
//! - Records: time spans with category and notes
//! - Calendar filters: turning a report page into a UTC time window
//! - Aggregation: bucketing records into days, weeks, months and years
//! - Reports: weekly, monthly and yearly grids with total rows
//!
//! Everything here is pure and synchronous. Storage and rendering live in
//! other crates.

pub mod aggregate;
pub mod calendar;
mod cursor;
pub mod duration;
mod record;
mod report;

pub use aggregate::{DailyBucket, MonthlyBucket, WeeklyBucket, YearlyBucket};
pub use calendar::{CalendarError, PeriodDates};
pub use cursor::{ReportCursor, ReportRequest, next_category};
pub use duration::{DurationParseError, format_duration, parse_duration};
pub use record::{Category, Record, Setting, Settings, ValidationError};
pub use report::{
    NO_DATA, Report, ReportKind, Row, RowStyle, TOTAL, UnknownReportKind, monthly_rows,
    weekly_rows, yearly_rows,
};
