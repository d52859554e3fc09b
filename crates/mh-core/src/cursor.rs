//! Report navigation state.
//!
//! The cursor remembers which report kind is shown, a page per kind and the
//! category filter. A report computed for an older cursor position is stale
//! and gets discarded by [`ReportCursor::accept`].

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::{CalendarError, clamp_offset};
use crate::record::Category;
use crate::report::{Report, ReportKind};

/// What to compute for one report page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub kind: ReportKind,
    /// Page offset, `0` for the current period.
    pub page: i32,
    /// Category filter, `None` for all categories.
    pub category_id: Option<i64>,
}

impl ReportRequest {
    /// UTC range `[from, before)` to load records for.
    pub fn date_range<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
        self.kind.date_range(now, self.page)
    }

    pub fn title<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<String, CalendarError> {
        self.kind.title(now, self.page)
    }
}

/// Current report position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportCursor {
    kind: ReportKind,
    pages: [i32; 3],
    category_id: Option<i64>,
}

impl ReportCursor {
    /// Cursor on the current page of `kind`.
    #[must_use]
    pub const fn new(kind: ReportKind, category_id: Option<i64>) -> Self {
        Self {
            kind,
            pages: [0; 3],
            category_id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Page of the active kind.
    #[must_use]
    pub const fn page(&self) -> i32 {
        self.pages[self.kind.index()]
    }

    #[must_use]
    pub const fn category_id(&self) -> Option<i64> {
        self.category_id
    }

    /// Jumps to `page` of the active kind; future pages clamp to `0`.
    pub const fn set_page(&mut self, page: i32) {
        self.pages[self.kind.index()] = clamp_offset(page);
    }

    /// Moves one period back.
    pub const fn previous_page(&mut self) {
        self.set_page(self.page().saturating_sub(1));
    }

    /// Moves one period forward, never past the current period.
    pub const fn next_page(&mut self) {
        self.set_page(self.page().saturating_add(1));
    }

    /// Switches the report kind. Each kind keeps its own page.
    pub const fn select_kind(&mut self, kind: ReportKind) {
        self.kind = kind;
    }

    pub const fn next_kind(&mut self) {
        self.kind = self.kind.next();
    }

    pub const fn previous_kind(&mut self) {
        self.kind = self.kind.previous();
    }

    pub const fn select_category(&mut self, category_id: Option<i64>) {
        self.category_id = category_id;
    }

    /// Request for the current position.
    #[must_use]
    pub const fn request(&self) -> ReportRequest {
        ReportRequest {
            kind: self.kind,
            page: self.page(),
            category_id: self.category_id,
        }
    }

    /// Returns `report` if it still answers the current position.
    pub fn accept(&self, report: Report) -> Option<Report> {
        let current = self.request();
        let answered = report.request();
        if answered == current {
            debug!(kind = %report.kind, page = report.page, "Report accepted");
            Some(report)
        } else {
            warn!(
                ?answered,
                ?current,
                "Discarding stale report"
            );
            None
        }
    }
}

/// Category after `current` in `categories`, wrapping to the first.
///
/// An unknown `current` also yields the first category.
#[must_use]
pub fn next_category(categories: &[Category], current: i64) -> Option<i64> {
    let position = categories.iter().position(|category| category.id == current);
    let next = position
        .and_then(|index| categories.get(index + 1))
        .or_else(|| categories.first())?;
    Some(next.id)
}
