//! Import command for loading finished records from a text file.
//!
//! Each line holds `start,duration,category,notes` where `start` is RFC 3339
//! and `duration` uses Go notation (`1h30m`, `45m`, `1.5h`). Blank lines and
//! lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use mh_core::{Record, parse_duration};
use mh_db::Database;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// File with one record per line.
    pub file: PathBuf,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, args: &ImportArgs) -> Result<usize> {
    let records = read_records(&args.file)?;
    let ids = db
        .import_records(&records)
        .with_context(|| format!("failed to import {}", args.file.display()))?;

    writeln!(writer, "Imported {} records", ids.len())?;
    Ok(ids.len())
}

fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_records(BufReader::new(file))
}

fn parse_records<R: BufRead>(reader: R) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let record =
            parse_line(trimmed).with_context(|| format!("invalid record on line {}", idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

fn parse_line(line: &str) -> Result<Record> {
    let mut fields = line.splitn(4, ',');
    let (Some(start), Some(duration), Some(category)) = (fields.next(), fields.next(), fields.next())
    else {
        anyhow::bail!("expected start,duration,category[,notes]");
    };
    let notes = fields.next().unwrap_or_default().trim();

    let start = DateTime::parse_from_rfc3339(start.trim())
        .with_context(|| format!("invalid start time {start:?}"))?
        .with_timezone(&Utc);
    let duration = parse_duration(duration.trim())?;
    let category_id: i64 = category
        .trim()
        .parse()
        .with_context(|| format!("invalid category {category:?}"))?;
    let end = start
        .checked_add_signed(duration)
        .context("end time out of range")?;

    Ok(Record::finished_at(start, end, category_id, notes))
}
