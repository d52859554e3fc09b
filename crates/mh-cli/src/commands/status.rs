//! Status command for showing the running record and this week's totals.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use mh_core::aggregate::records_as_weeks;
use mh_core::{calendar, format_duration};
use mh_db::Database;

use super::util::category_name;

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    database_path: &Path,
    now: &DateTime<Tz>,
) -> Result<()> {
    let categories = db.categories()?;
    let settings = db.settings()?;

    writeln!(writer, "myhours status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(
        writer,
        "Default category: {}",
        category_name(&categories, settings.default_category_id)
    )?;

    match db.active_record()? {
        Some(active) => {
            let running = (now.with_timezone(&Utc) - active.start).max(TimeDelta::zero());
            writeln!(
                writer,
                "Active: record {} ({}) running for {}",
                active.id,
                category_name(&categories, active.category_id),
                format_duration(running)
            )?;
            if !active.notes.is_empty() {
                writeln!(writer, "Notes: {}", active.notes)?;
            }
        }
        None => writeln!(writer, "Active: none")?,
    }

    let (from, before) = calendar::week_filter(now, 0)?;
    let records = db.records(from, before)?;
    let weeks = records_as_weeks(&records, &now.timezone());
    let today = now.date_naive();
    let (today_total, week_total) = weeks.first().map_or(
        (TimeDelta::zero(), TimeDelta::zero()),
        |week| {
            let today_total = week
                .days
                .iter()
                .find(|day| day.date == today)
                .map_or(TimeDelta::zero(), |day| day.total);
            (today_total, week.total)
        },
    );

    writeln!(writer, "Today: {}", format_duration(today_total))?;
    writeln!(writer, "This week: {}", format_duration(week_total))?;

    Ok(())
}
