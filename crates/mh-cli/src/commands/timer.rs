//! Start and stop commands for the running record.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Args;

use mh_core::format_duration;
use mh_db::Database;

use super::util::{category_name, parse_datetime};

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Category ID to record under. Defaults to the default category.
    #[arg(long)]
    pub category: Option<i64>,

    /// Notes for the record.
    #[arg(short, long, default_value = "")]
    pub notes: String,

    /// Start time (RFC 3339 or e.g. "15 minutes ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Args)]
pub struct StopArgs {
    /// Replace the notes of the running record.
    #[arg(short, long)]
    pub notes: Option<String>,

    /// End time (RFC 3339 or e.g. "15 minutes ago"). Defaults to now.
    #[arg(long)]
    pub at: Option<String>,
}

fn resolve_time(at: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    at.map_or(Ok(now), |at| parse_datetime(at, now))
}

/// Starts a new record.
pub fn start<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &StartArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let started = resolve_time(args.at.as_deref(), now)?;
    if started > now {
        anyhow::bail!("cannot start a record in the future");
    }
    let category_id = match args.category {
        Some(id) => id,
        None => db.settings()?.default_category_id,
    };

    let id = db
        .start_record(started, category_id, &args.notes)
        .context("failed to start record")?;
    let categories = db.categories()?;

    writeln!(
        writer,
        "Started record {id} ({}) at {}",
        category_name(&categories, category_id),
        started.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )?;
    Ok(())
}

/// Finishes the running record.
pub fn stop<W: Write>(
    writer: &mut W,
    db: &mut Database,
    args: &StopArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let ended = resolve_time(args.at.as_deref(), now)?;
    let record = db
        .finish_active_record(ended, args.notes.as_deref())
        .context("failed to stop record")?;

    writeln!(
        writer,
        "Stopped record {} after {}",
        record.id,
        format_duration(record.elapsed())
    )?;
    Ok(())
}
