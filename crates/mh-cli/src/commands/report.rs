//! Report command for generating time reports.
//!
//! This module implements `mh report [week|month|year]` with page navigation,
//! category filtering and output formats (plain-text table, JSON).

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::Args;
use serde::Serialize;

use mh_core::{Report, ReportCursor, ReportKind, ReportRequest, RowStyle};
use mh_db::Database;

use super::util::category_name;
use crate::Config;

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Report kind: week, month or year. Defaults to the configured report.
    pub kind: Option<ReportKind>,

    /// Page relative to the current period (0 = current, -1 = previous).
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub page: i32,

    /// Only include records of this category. Defaults to the default category.
    #[arg(long, conflicts_with = "all")]
    pub category: Option<i64>,

    /// Include records of every category.
    #[arg(long)]
    pub all: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

// ========== Report Generation ==========

/// Loads the records of `request`'s window and builds the report.
pub fn generate_report<Tz: TimeZone>(
    db: &Database,
    request: &ReportRequest,
    now: &DateTime<Tz>,
) -> Result<Report> {
    let (from, before) = request
        .date_range(now)
        .with_context(|| format!("page {} is out of range", request.page))?;
    let records = match request.category_id {
        Some(category_id) => db.records_in_category(from, before, category_id),
        None => db.records(from, before),
    }
    .context("failed to load records")?;

    tracing::debug!(
        kind = %request.kind,
        page = request.page,
        count = records.len(),
        "building report"
    );
    Report::build(request, &records, now).context("failed to build report")
}

// ========== Table Output ==========

fn column_widths(report: &Report) -> [usize; 3] {
    let mut widths = report.headers.map(|header| header.chars().count());
    for row in &report.rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

fn table_line(cells: [&str; 3], widths: [usize; 3]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn rule(widths: [usize; 3]) -> String {
    widths.map(|width| "─".repeat(width)).join("  ")
}

/// Formats the report as a plain-text table.
///
/// Total rows are set apart by a rule above them.
pub fn format_report(report: &Report, category: Option<&str>) -> String {
    let mut output = String::new();
    let widths = column_widths(report);

    writeln!(output, "{}", report.title).unwrap();
    writeln!(output, "Category: {}", category.unwrap_or("all")).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "{}", table_line(report.headers, widths)).unwrap();
    writeln!(output, "{}", rule(widths)).unwrap();
    for (index, row) in report.rows.iter().enumerate() {
        if report.style(index) == RowStyle::Total {
            writeln!(output, "{}", rule(widths)).unwrap();
        }
        writeln!(output, "{}", table_line(row.cells(), widths)).unwrap();
    }

    output
}

// ========== JSON Output ==========

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    timezone: String,
    category: Option<&'a str>,
    #[serde(flatten)]
    report: &'a Report,
}

/// Formats the report as JSON.
pub fn format_report_json(
    report: &Report,
    category: Option<&str>,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
    let json = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        timezone,
        category,
        report,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    args: &ReportArgs,
    now: &DateTime<Tz>,
) -> Result<()> {
    let category_id = if args.all {
        None
    } else {
        match args.category {
            Some(id) => Some(id),
            None => Some(db.settings()?.default_category_id),
        }
    };
    let mut cursor = ReportCursor::new(args.kind.unwrap_or(config.default_report), category_id);
    cursor.set_page(args.page);

    let report = generate_report(db, &cursor.request(), now)?;
    let Some(report) = cursor.accept(report) else {
        anyhow::bail!("report does not match the requested page");
    };

    let categories = db.categories()?;
    let category = report
        .category_id
        .map(|id| category_name(&categories, id).to_string());

    if args.json {
        let output = format_report_json(&report, category.as_deref(), Utc::now())?;
        writeln!(writer, "{output}")?;
    } else {
        write!(writer, "{}", format_report(&report, category.as_deref()))?;
    }
    Ok(())
}
