//! Calendar filters for report pages.
//!
//! A report page is a non-positive offset from the current period: `0` is the
//! current week, month or year and `-n` is `n` periods back. Positive offsets
//! are clamped to `0`, the future cannot be browsed.
//!
//! Period bounds are computed on local calendar dates and only then converted
//! to UTC, so DST transitions produce 23 or 25 hour days instead of shifted
//! week boundaries.

use chrono::{
    DateTime, Datelike, Days, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta,
    TimeZone, Utc,
};
use thiserror::Error;

/// Calendar computation errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CalendarError {
    /// The page offset moves past the representable calendar.
    #[error("page offset {offset} is outside the supported calendar range")]
    OutOfRange { offset: i32 },
}

/// Clamps a page offset so that it never points into the future.
#[must_use]
pub const fn clamp_offset(offset: i32) -> i32 {
    if offset > 0 { 0 } else { offset }
}

/// Local calendar dates of a report period, as the half-open range
/// `[first, next)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodDates {
    /// First day of the period.
    pub first: NaiveDate,
    /// First day after the period.
    pub next: NaiveDate,
}

impl PeriodDates {
    /// Last day inside the period.
    #[must_use]
    pub fn last(&self) -> NaiveDate {
        self.next.pred_opt().unwrap_or(self.first)
    }

    /// Converts the period to a UTC instant range `[from, before)` using
    /// local midnights in `tz`.
    pub fn to_utc<Tz: TimeZone>(&self, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            local_midnight_to_utc(tz, self.first),
            local_midnight_to_utc(tz, self.next),
        )
    }
}

/// Converts a local date at midnight to UTC.
///
/// Ambiguous midnights (DST fall-back) resolve to the earlier instant. A
/// midnight that falls into a DST gap resolves to the first local time that
/// exists after it.
pub fn local_midnight_to_utc<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => first_instant_after_gap(tz, midnight),
    }
}

fn first_instant_after_gap<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    // Gaps are a few hours at most; probe forward in quarter hours.
    (1..=4 * 24)
        .find_map(|step| {
            let probe = local.checked_add_signed(TimeDelta::minutes(15 * step))?;
            tz.from_local_datetime(&probe).earliest()
        })
        .map_or_else(
            || Utc.from_utc_datetime(&local),
            |dt| dt.with_timezone(&Utc),
        )
}

/// Monday-to-Monday dates of the ISO week `offset` weeks from `today`.
pub fn week_dates(today: NaiveDate, offset: i32) -> Result<PeriodDates, CalendarError> {
    let offset = clamp_offset(offset);
    let out_of_range = || CalendarError::OutOfRange { offset };

    let shifted = TimeDelta::try_days(i64::from(offset) * 7)
        .and_then(|delta| today.checked_add_signed(delta))
        .ok_or_else(out_of_range)?;
    // Sunday is day 7 of the ISO week, not day 0.
    let day_of_week = shifted.weekday().number_from_monday();
    let first = shifted
        .checked_sub_days(Days::new(u64::from(day_of_week - 1)))
        .ok_or_else(out_of_range)?;
    let next = first
        .checked_add_days(Days::new(7))
        .ok_or_else(out_of_range)?;
    Ok(PeriodDates { first, next })
}

/// First-of-month dates of the month `offset` months from `today`.
pub fn month_dates(today: NaiveDate, offset: i32) -> Result<PeriodDates, CalendarError> {
    let offset = clamp_offset(offset);
    let out_of_range = || CalendarError::OutOfRange { offset };

    let first = today
        .with_day(1)
        .and_then(|current| current.checked_sub_months(Months::new(offset.unsigned_abs())))
        .ok_or_else(out_of_range)?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(out_of_range)?;
    Ok(PeriodDates { first, next })
}

/// January 1st dates of the year `offset` years from `today`.
pub fn year_dates(today: NaiveDate, offset: i32) -> Result<PeriodDates, CalendarError> {
    let offset = clamp_offset(offset);
    let out_of_range = || CalendarError::OutOfRange { offset };

    let year = today.year().checked_add(offset).ok_or_else(out_of_range)?;
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(out_of_range)?;
    let next = year
        .checked_add(1)
        .and_then(|next_year| NaiveDate::from_ymd_opt(next_year, 1, 1))
        .ok_or_else(out_of_range)?;
    Ok(PeriodDates { first, next })
}

/// UTC range `[from, before)` of the week page `offset` relative to `now`.
pub fn week_filter<Tz: TimeZone>(
    now: &DateTime<Tz>,
    offset: i32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
    Ok(week_dates(now.date_naive(), offset)?.to_utc(&now.timezone()))
}

/// UTC range `[from, before)` of the month page `offset` relative to `now`.
pub fn month_filter<Tz: TimeZone>(
    now: &DateTime<Tz>,
    offset: i32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
    Ok(month_dates(now.date_naive(), offset)?.to_utc(&now.timezone()))
}

/// UTC range `[from, before)` of the year page `offset` relative to `now`.
pub fn year_filter<Tz: TimeZone>(
    now: &DateTime<Tz>,
    offset: i32,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CalendarError> {
    Ok(year_dates(now.date_naive(), offset)?.to_utc(&now.timezone()))
}

/// Title such as `Week 34, 2024 (2024-08-19 – 2024-08-25)`.
pub fn week_title<Tz: TimeZone>(now: &DateTime<Tz>, offset: i32) -> Result<String, CalendarError> {
    let dates = week_dates(now.date_naive(), offset)?;
    let iso = dates.first.iso_week();
    Ok(format!(
        "Week {}, {} ({} – {})",
        iso.week(),
        iso.year(),
        dates.first,
        dates.last()
    ))
}

/// Title such as `August, 2024 (2024-08-01 – 2024-08-31)`.
pub fn month_title<Tz: TimeZone>(now: &DateTime<Tz>, offset: i32) -> Result<String, CalendarError> {
    let dates = month_dates(now.date_naive(), offset)?;
    Ok(format!(
        "{}, {} ({} – {})",
        dates.first.format("%B"),
        dates.first.year(),
        dates.first,
        dates.last()
    ))
}

/// Title such as `Year 2024`.
pub fn year_title<Tz: TimeZone>(now: &DateTime<Tz>, offset: i32) -> Result<String, CalendarError> {
    let dates = year_dates(now.date_naive(), offset)?;
    Ok(format!("Year {}", dates.first.year()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use chrono_tz::America::Havana;
    use chrono_tz::Europe::Helsinki;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    // ========== Week Tests ==========

    #[test]
    fn week_filter_for_wednesday() {
        // Aug 21, 2024 is a Wednesday
        let now = utc(2024, 8, 21, 12);
        let (from, before) = week_filter(&now, 0).unwrap();
        assert_eq!(from, utc(2024, 8, 19, 0));
        assert_eq!(before, utc(2024, 8, 26, 0));
    }

    #[test]
    fn week_filter_monday_starts_its_own_week() {
        let now = utc(2024, 8, 19, 0);
        let (from, before) = week_filter(&now, 0).unwrap();
        assert_eq!(from, utc(2024, 8, 19, 0));
        assert_eq!(before, utc(2024, 8, 26, 0));
    }

    #[test]
    fn week_filter_sunday_is_last_day_of_week() {
        // Aug 25, 2024 is a Sunday
        let now = utc(2024, 8, 25, 23);
        let (from, before) = week_filter(&now, 0).unwrap();
        assert_eq!(from, utc(2024, 8, 19, 0));
        assert_eq!(before, utc(2024, 8, 26, 0));
    }

    #[test]
    fn week_filter_previous_pages() {
        let now = utc(2024, 8, 21, 12);
        let (from, before) = week_filter(&now, -1).unwrap();
        assert_eq!(from, utc(2024, 8, 12, 0));
        assert_eq!(before, utc(2024, 8, 19, 0));

        let (from, _) = week_filter(&now, -34).unwrap();
        assert_eq!(from, utc(2023, 12, 25, 0));
    }

    #[test]
    fn future_pages_clamp_to_current() {
        let now = utc(2024, 8, 21, 12);
        assert_eq!(week_filter(&now, 3).unwrap(), week_filter(&now, 0).unwrap());
        assert_eq!(month_filter(&now, 1).unwrap(), month_filter(&now, 0).unwrap());
        assert_eq!(year_filter(&now, 9).unwrap(), year_filter(&now, 0).unwrap());
        assert_eq!(week_title(&now, 2).unwrap(), week_title(&now, 0).unwrap());
    }

    #[test]
    fn week_filter_uses_local_date() {
        // 00:30 Monday at UTC+3 is still Sunday in UTC.
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 8, 19, 0, 30, 0).unwrap();
        let (from, before) = week_filter(&now, 0).unwrap();
        assert_eq!(from, utc(2024, 8, 18, 21));
        assert_eq!(before, utc(2024, 8, 25, 21));
    }

    #[test]
    fn week_title_uses_iso_year_of_monday() {
        // Jan 1, 2025 is a Wednesday in week 1 of 2025, which starts in 2024.
        let now = utc(2025, 1, 1, 12);
        assert_eq!(
            week_title(&now, 0).unwrap(),
            "Week 1, 2025 (2024-12-30 – 2025-01-05)"
        );
        assert_eq!(
            week_title(&utc(2024, 8, 21, 12), 0).unwrap(),
            "Week 34, 2024 (2024-08-19 – 2024-08-25)"
        );
    }

    #[test]
    fn week_53_title() {
        // Dec 31, 2020 belongs to week 53 of 2020.
        let now = utc(2020, 12, 31, 12);
        assert_eq!(
            week_title(&now, 0).unwrap(),
            "Week 53, 2020 (2020-12-28 – 2021-01-03)"
        );
    }

    #[test]
    fn week_spanning_spring_dst_is_167_hours() {
        // EU clocks moved forward on Mar 31, 2024.
        let now = Helsinki.with_ymd_and_hms(2024, 3, 27, 12, 0, 0).unwrap();
        let (from, before) = week_filter(&now, 0).unwrap();
        assert_eq!(from, utc(2024, 3, 24, 22));
        assert_eq!(before, utc(2024, 3, 31, 21));
        assert_eq!(before - from, TimeDelta::hours(167));
    }

    // ========== Month Tests ==========

    #[test]
    fn month_filter_current_and_previous() {
        let now = utc(2024, 8, 21, 12);
        assert_eq!(
            month_filter(&now, 0).unwrap(),
            (utc(2024, 8, 1, 0), utc(2024, 9, 1, 0))
        );
        assert_eq!(
            month_filter(&now, -1).unwrap(),
            (utc(2024, 7, 1, 0), utc(2024, 8, 1, 0))
        );
    }

    #[test]
    fn month_filter_rolls_over_year_boundary() {
        let now = utc(2024, 8, 21, 12);
        assert_eq!(
            month_filter(&now, -8).unwrap(),
            (utc(2023, 12, 1, 0), utc(2024, 1, 1, 0))
        );
        let now = utc(2024, 1, 15, 12);
        assert_eq!(
            month_filter(&now, -1).unwrap(),
            (utc(2023, 12, 1, 0), utc(2024, 1, 1, 0))
        );
    }

    #[test]
    fn month_filter_from_end_of_long_month() {
        // Moving back from Mar 31 lands in February, not early March.
        let now = utc(2024, 3, 31, 12);
        assert_eq!(
            month_filter(&now, -1).unwrap(),
            (utc(2024, 2, 1, 0), utc(2024, 3, 1, 0))
        );
        assert_eq!(
            month_title(&now, -1).unwrap(),
            "February, 2024 (2024-02-01 – 2024-02-29)"
        );
    }

    #[test]
    fn month_title_format() {
        let now = utc(2024, 8, 21, 12);
        assert_eq!(
            month_title(&now, 0).unwrap(),
            "August, 2024 (2024-08-01 – 2024-08-31)"
        );
    }

    // ========== Year Tests ==========

    #[test]
    fn year_filter_and_title() {
        let now = utc(2024, 8, 21, 12);
        assert_eq!(
            year_filter(&now, 0).unwrap(),
            (utc(2024, 1, 1, 0), utc(2025, 1, 1, 0))
        );
        assert_eq!(
            year_filter(&now, -1).unwrap(),
            (utc(2023, 1, 1, 0), utc(2024, 1, 1, 0))
        );
        assert_eq!(year_title(&now, 0).unwrap(), "Year 2024");
        assert_eq!(year_title(&now, -4).unwrap(), "Year 2020");
    }

    #[test]
    fn huge_offsets_are_errors() {
        let now = utc(2024, 8, 21, 12);
        assert_eq!(
            year_filter(&now, i32::MIN),
            Err(CalendarError::OutOfRange { offset: i32::MIN })
        );
        assert!(month_filter(&now, i32::MIN).is_err());
        assert!(week_filter(&now, i32::MIN).is_err());
    }

    // ========== Midnight Conversion Tests ==========

    #[test]
    fn period_last_day() {
        let dates = month_dates(date(2024, 2, 10), 0).unwrap();
        assert_eq!(dates.first, date(2024, 2, 1));
        assert_eq!(dates.last(), date(2024, 2, 29));
        assert_eq!(dates.next, date(2024, 3, 1));
    }

    #[test]
    fn midnight_in_dst_gap_moves_forward() {
        // Cuba springs forward from 00:00 to 01:00 on Mar 10, 2024.
        assert_eq!(
            local_midnight_to_utc(&Havana, date(2024, 3, 10)),
            utc(2024, 3, 10, 5)
        );
    }

    #[test]
    fn ambiguous_midnight_picks_earlier_instant() {
        // Cuba falls back from 01:00 to 00:00 on Nov 3, 2024.
        assert_eq!(
            local_midnight_to_utc(&Havana, date(2024, 11, 3)),
            utc(2024, 11, 3, 4)
        );
    }
}
