//! Weekly, monthly and yearly report variants.
//!
//! A report flattens the bucket hierarchy into a three-column grid. Every
//! group of rows ends with a total row; a window without records yields a
//! single `NO DATA` row instead of an empty grid. Rows carry their own tag
//! so renderers never have to guess from cell content.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::aggregate::{
    MonthlyBucket, WeeklyBucket, YearlyBucket, records_as_months, records_as_weeks,
    records_as_years,
};
use crate::calendar::{self, CalendarError};
use crate::cursor::ReportRequest;
use crate::duration::format_duration;
use crate::record::Record;

/// Placeholder shown in every cell of an empty report.
pub const NO_DATA: &str = "NO DATA";

/// Label of total rows.
pub const TOTAL: &str = "Total";

/// Report granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    #[default]
    Weekly,
    Monthly,
    Yearly,
}

/// Error for an unrecognised report kind name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown report kind: {0} (expected week, month or year)")]
pub struct UnknownReportKind(pub String);

impl ReportKind {
    pub const ALL: [Self; 3] = [Self::Weekly, Self::Monthly, Self::Yearly];

    /// String representation used in configuration and JSON.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Following kind, wrapping from yearly back to weekly.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Weekly => Self::Monthly,
            Self::Monthly => Self::Yearly,
            Self::Yearly => Self::Weekly,
        }
    }

    /// Preceding kind, wrapping from weekly to yearly.
    #[must_use]
    pub const fn previous(self) -> Self {
        match self {
            Self::Weekly => Self::Yearly,
            Self::Monthly => Self::Weekly,
            Self::Yearly => Self::Monthly,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Weekly => 0,
            Self::Monthly => 1,
            Self::Yearly => 2,
        }
    }

    /// Column names.
    #[must_use]
    pub const fn headers(self) -> [&'static str; 3] {
        match self {
            Self::Weekly => ["Weekday", "Date", "Duration"],
            Self::Monthly => ["Week", "Dates", "Duration"],
            Self::Yearly => ["Month", "Active days", "Duration"],
        }
    }

    /// UTC range `[from, before)` of page `offset`.
    pub fn date_range<Tz: TimeZone>(
        self,
        now: &DateTime<Tz>,
        offset: i32,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
        match self {
            Self::Weekly => calendar::week_filter(now, offset),
            Self::Monthly => calendar::month_filter(now, offset),
            Self::Yearly => calendar::year_filter(now, offset),
        }
    }

    /// Display title of page `offset`.
    pub fn title<Tz: TimeZone>(self, now: &DateTime<Tz>, offset: i32) -> Result<String, CalendarError> {
        match self {
            Self::Weekly => calendar::week_title(now, offset),
            Self::Monthly => calendar::month_title(now, offset),
            Self::Yearly => calendar::year_title(now, offset),
        }
    }

    /// Aggregates `records` (sorted by start) in `tz` and flattens them into rows.
    pub fn rows<Tz: TimeZone>(self, records: &[Record], tz: &Tz) -> Vec<Row> {
        match self {
            Self::Weekly => weekly_rows(&records_as_weeks(records, tz)),
            Self::Monthly => monthly_rows(&records_as_months(records, tz)),
            Self::Yearly => yearly_rows(&records_as_years(records, tz)),
        }
    }

    /// Style hint for the row at `row_index`.
    #[must_use]
    pub fn classify(row_index: usize, rows: &[Row]) -> RowStyle {
        rows.get(row_index).map_or(RowStyle::Normal, Row::style)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = UnknownReportKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" | "weekly" => Ok(Self::Weekly),
            "month" | "monthly" => Ok(Self::Monthly),
            "year" | "yearly" => Ok(Self::Yearly),
            _ => Err(UnknownReportKind(s.to_string())),
        }
    }
}

// ========== Rows ==========

/// Visual emphasis of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStyle {
    Normal,
    Total,
}

/// One line of a report grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Data([String; 3]),
    Total([String; 3]),
    /// Sentinel for a window without records.
    NoData,
}

impl Row {
    fn total(middle: impl Into<String>, duration: TimeDelta) -> Self {
        Self::Total([TOTAL.to_string(), middle.into(), format_duration(duration)])
    }

    /// Cell contents.
    #[must_use]
    pub fn cells(&self) -> [&str; 3] {
        match self {
            Self::Data([a, b, c]) | Self::Total([a, b, c]) => [a.as_str(), b.as_str(), c.as_str()],
            Self::NoData => [NO_DATA; 3],
        }
    }

    #[must_use]
    pub const fn style(&self) -> RowStyle {
        match self {
            Self::Total(_) => RowStyle::Total,
            Self::Data(_) | Self::NoData => RowStyle::Normal,
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("Row", 2)?;
        row.serialize_field("style", &self.style())?;
        row.serialize_field("cells", &self.cells())?;
        row.end()
    }
}

fn or_no_data(mut rows: Vec<Row>) -> Vec<Row> {
    if rows.is_empty() {
        rows.push(Row::NoData);
    }
    rows
}

/// One row per day (`Mon`, `2024-08-19`, `3h0m0s`) and a total per week.
#[must_use]
pub fn weekly_rows(weeks: &[WeeklyBucket]) -> Vec<Row> {
    let mut rows = Vec::with_capacity(weeks.len() * 8);
    for week in weeks {
        rows.extend(week.days.iter().map(|day| {
            Row::Data([
                day.date.format("%a").to_string(),
                day.date.to_string(),
                format_duration(day.total),
            ])
        }));
        rows.push(Row::total("", week.total));
    }
    or_no_data(rows)
}

/// One row per (partial) week (`W34`, `2024-08-19 – 2024-08-25`) and a total
/// per month.
#[must_use]
pub fn monthly_rows(months: &[MonthlyBucket]) -> Vec<Row> {
    let mut rows = Vec::new();
    for month in months {
        rows.extend(month.weeks.iter().map(|week| {
            let dates = week
                .date_range()
                .map(|(first, last)| format!("{first} – {last}"))
                .unwrap_or_default();
            Row::Data([format!("W{}", week.week), dates, format_duration(week.total)])
        }));
        rows.push(Row::total("", month.total));
    }
    or_no_data(rows)
}

/// One row per month with its active day count, and a total per year.
#[must_use]
pub fn yearly_rows(years: &[YearlyBucket]) -> Vec<Row> {
    let mut rows = Vec::new();
    for year in years {
        rows.extend(year.months.iter().map(|month| {
            Row::Data([
                month.name(),
                month.active_days().to_string(),
                format_duration(month.total),
            ])
        }));
        rows.push(Row::total(year.active_days().to_string(), year.total));
    }
    or_no_data(rows)
}

// ========== Report ==========

/// A fully computed report page, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub kind: ReportKind,
    pub page: i32,
    pub category_id: Option<i64>,
    pub title: String,
    pub headers: [&'static str; 3],
    pub rows: Vec<Row>,
    pub from: DateTime<Utc>,
    pub before: DateTime<Utc>,
}

impl Report {
    /// Builds the report for `request` from the records of its window.
    ///
    /// `records` must already be limited to the window and sorted by start;
    /// `now` supplies both the reference date and the display timezone.
    pub fn build<Tz: TimeZone>(
        request: &ReportRequest,
        records: &[Record],
        now: &DateTime<Tz>,
    ) -> Result<Self, CalendarError> {
        let (from, before) = request.date_range(now)?;
        Ok(Self {
            kind: request.kind,
            page: request.page,
            category_id: request.category_id,
            title: request.title(now)?,
            headers: request.kind.headers(),
            rows: request.kind.rows(records, &now.timezone()),
            from,
            before,
        })
    }

    /// The request this report answers.
    #[must_use]
    pub const fn request(&self) -> ReportRequest {
        ReportRequest {
            kind: self.kind,
            page: self.page,
            category_id: self.category_id,
        }
    }

    /// Style hint for the row at `row_index`.
    #[must_use]
    pub fn style(&self, row_index: usize) -> RowStyle {
        ReportKind::classify(row_index, &self.rows)
    }
}
