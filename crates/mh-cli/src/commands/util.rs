//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, TimeDelta, Utc};
use mh_core::Category;
use regex::Regex;

/// Matches `N unit(s) ago`.
static RELATIVE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").expect("relative time regex")
});

/// Upper bound for relative times, about 1000 years in minutes.
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either RFC 3339 or time relative to `now`.
///
/// Supports:
/// - RFC 3339: "2024-08-19T08:00:00Z", "2024-08-19T10:00:00+02:00"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
/// - "now"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid time: {s}. Use RFC 3339 (e.g., 2024-08-19T08:00:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let count: i64 = caps[1]
        .parse()
        .with_context(|| format!("relative time {s:?} has too many digits"))?;
    let unit_minutes = match &caps[2] {
        "minute" => 1,
        "hour" => 60,
        "day" => 60 * 24,
        "week" => 60 * 24 * 7,
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };
    let minutes = count
        .checked_mul(unit_minutes)
        .filter(|minutes| *minutes <= MAX_RELATIVE_MINUTES)
        .with_context(|| format!("relative time {s:?} is too far back"))?;

    Ok(now - TimeDelta::minutes(minutes))
}

/// Name of the category with `id`, or `unknown`.
pub fn category_name(categories: &[Category], id: i64) -> &str {
    categories
        .iter()
        .find(|category| category.id == id)
        .map_or("unknown", |category| category.name.as_str())
}
