//! Aggregation of records into day, week, month and year buckets.
//!
//! Records are bucketed by the local calendar date of their start. Every
//! bucket keeps a running total that always equals the sum of its children.
//! Durations are accumulated at full precision; truncation to whole seconds
//! happens only when a total is displayed.
//!
//! Input must be sorted by start time ascending, which is how storage returns
//! it. Unsorted input is a caller bug and panics instead of producing
//! duplicated buckets.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeDelta, TimeZone, Utc, Weekday};

use crate::record::Record;

// ========== Buckets ==========

/// Time spent on one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub total: TimeDelta,
    /// Non-empty record notes in arrival order.
    pub notes: Vec<String>,
}

impl DailyBucket {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total: TimeDelta::zero(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// Returns true when any time was recorded on this day.
    #[must_use]
    pub fn active(&self) -> bool {
        self.total > TimeDelta::zero()
    }
}

/// Time spent in one ISO week.
///
/// Standalone weeks always hold all seven days, Monday first. Weeks inside a
/// [`MonthlyBucket`] hold only the days that fall inside that month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyBucket {
    pub iso_year: i32,
    pub week: u32,
    pub total: TimeDelta,
    /// Consecutive days of the week, in calendar order.
    pub days: Vec<DailyBucket>,
}

impl WeeklyBucket {
    /// Seeds the full Monday to Sunday week containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        // Sunday is the 7th day, so it looks back six days to Monday.
        let back = u64::from(date.weekday().num_days_from_monday());
        let monday = date.checked_sub_days(Days::new(back)).unwrap_or(date);
        let iso = monday.iso_week();
        Self {
            iso_year: iso.year(),
            week: iso.week(),
            total: TimeDelta::zero(),
            days: monday.iter_days().take(7).map(DailyBucket::empty).collect(),
        }
    }

    fn partial(iso_year: i32, week: u32) -> Self {
        Self {
            iso_year,
            week,
            total: TimeDelta::zero(),
            days: Vec::with_capacity(7),
        }
    }

    /// Returns true when `date` belongs to this ISO week.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        let iso = date.iso_week();
        (iso.year(), iso.week()) == (self.iso_year, self.week)
    }

    /// First and last seeded day.
    #[must_use]
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.days.first()?.date, self.days.last()?.date))
    }

    #[must_use]
    pub fn active_days(&self) -> usize {
        self.days.iter().filter(|day| day.active()).count()
    }

    /// Adds time to the day `date` and to the week total.
    ///
    /// Panics if `date` was not seeded into this week.
    fn add(&mut self, date: NaiveDate, duration: TimeDelta, notes: &str) {
        let iso_year = self.iso_year;
        let week = self.week;
        let day = self.day_mut(date).unwrap_or_else(|| {
            panic!("day {date} is not seeded in week {iso_year}-W{week:02}")
        });
        day.total += duration;
        if !notes.is_empty() {
            day.notes.push(notes.to_string());
        }
        self.total += duration;
    }

    fn day_mut(&mut self, date: NaiveDate) -> Option<&mut DailyBucket> {
        // Days are consecutive, so the offset from the first one is the index.
        let first = self.days.first()?.date;
        let index = usize::try_from((date - first).num_days()).ok()?;
        self.days.get_mut(index).filter(|day| day.date == date)
    }
}

/// Time spent in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub total: TimeDelta,
    /// One bucket per ISO week intersecting the month, truncated to the
    /// month's days.
    pub weeks: Vec<WeeklyBucket>,
}

impl MonthlyBucket {
    /// Seeds the month containing `date` with all of its (partial) weeks.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        let first_date = date
            .checked_sub_days(Days::new(u64::from(date.day0())))
            .unwrap_or(date);
        let last_date = first_date
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);

        // A new week starts whenever the ISO (year, week) key changes. Comparing
        // the full key keeps early January days in last year's week 52/53
        // apart from late December days in next year's week 1.
        let mut weeks: Vec<WeeklyBucket> = Vec::with_capacity(6);
        for day in first_date.iter_days().take_while(|day| *day <= last_date) {
            let iso = day.iso_week();
            let current = last_or_open(
                &mut weeks,
                |week| week.covers(day),
                || WeeklyBucket::partial(iso.year(), iso.week()),
            );
            current.days.push(DailyBucket::empty(day));
        }

        Self {
            year: first_date.year(),
            month: first_date.month(),
            first_date,
            last_date,
            total: TimeDelta::zero(),
            weeks,
        }
    }

    /// Returns true when `date` lies inside this month.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        (date.year(), date.month()) == (self.year, self.month)
    }

    #[must_use]
    pub fn active_days(&self) -> usize {
        self.weeks.iter().map(WeeklyBucket::active_days).sum()
    }

    /// Full month name, e.g. `August`.
    #[must_use]
    pub fn name(&self) -> String {
        self.first_date.format("%B").to_string()
    }

    /// Adds time to the week and day containing `date`.
    ///
    /// Panics if the seeded weeks do not contain `date`; that means the
    /// seeding walk above is broken.
    fn add(&mut self, date: NaiveDate, duration: TimeDelta, notes: &str) {
        let Some(week) = self.weeks.iter_mut().find(|week| week.covers(date)) else {
            let iso = date.iso_week();
            panic!(
                "no seeded week {}-W{:02} in month {}-{:02}",
                iso.year(),
                iso.week(),
                self.year,
                self.month
            );
        };
        week.add(date, duration, notes);
        self.total += duration;
    }
}

/// Time spent in one calendar year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearlyBucket {
    pub year: i32,
    pub total: TimeDelta,
    /// January to December, all seeded.
    pub months: Vec<MonthlyBucket>,
}

impl YearlyBucket {
    /// Seeds all twelve months of `year`.
    #[must_use]
    pub fn seeded(year: i32) -> Self {
        Self {
            year,
            total: TimeDelta::zero(),
            months: (1..=12)
                .filter_map(|month| NaiveDate::from_ymd_opt(year, month, 1))
                .map(MonthlyBucket::containing)
                .collect(),
        }
    }

    #[must_use]
    pub fn active_days(&self) -> usize {
        self.months.iter().map(MonthlyBucket::active_days).sum()
    }

    fn add(&mut self, date: NaiveDate, duration: TimeDelta, notes: &str) {
        let year = self.year;
        let Some(month) = self.months.iter_mut().find(|month| month.covers(date)) else {
            panic!("no seeded month for {date} in year {year}");
        };
        month.add(date, duration, notes);
        self.total += duration;
    }
}

// ========== Aggregation ==========

/// Groups records into full ISO weeks in local time.
pub fn records_as_weeks<Tz: TimeZone>(records: &[Record], tz: &Tz) -> Vec<WeeklyBucket> {
    let mut weeks: Vec<WeeklyBucket> = Vec::new();
    for (date, record) in local_dates(records, tz) {
        let current = last_or_open(
            &mut weeks,
            |week| week.covers(date),
            || WeeklyBucket::containing(date),
        );
        current.add(date, record.elapsed(), &record.notes);
    }
    weeks
}

/// Groups records into calendar months in local time.
pub fn records_as_months<Tz: TimeZone>(records: &[Record], tz: &Tz) -> Vec<MonthlyBucket> {
    let mut months: Vec<MonthlyBucket> = Vec::new();
    for (date, record) in local_dates(records, tz) {
        let current = last_or_open(
            &mut months,
            |month| month.covers(date),
            || MonthlyBucket::containing(date),
        );
        current.add(date, record.elapsed(), &record.notes);
    }
    months
}

/// Groups records into calendar years in local time.
pub fn records_as_years<Tz: TimeZone>(records: &[Record], tz: &Tz) -> Vec<YearlyBucket> {
    let mut years: Vec<YearlyBucket> = Vec::new();
    for (date, record) in local_dates(records, tz) {
        let current = last_or_open(
            &mut years,
            |year| year.year == date.year(),
            || YearlyBucket::seeded(date.year()),
        );
        current.add(date, record.elapsed(), &record.notes);
    }
    years
}

/// Pairs each record with the local date of its start, checking the order.
fn local_dates<'a, Tz: TimeZone>(
    records: &'a [Record],
    tz: &'a Tz,
) -> impl Iterator<Item = (NaiveDate, &'a Record)> + 'a {
    let mut previous: Option<DateTime<Utc>> = None;
    records.iter().map(move |record| {
        if let Some(previous) = previous {
            assert!(
                previous <= record.start,
                "records must be sorted by start: {} came after {previous}",
                record.start
            );
        }
        previous = Some(record.start);
        (record.start.with_timezone(tz).date_naive(), record)
    })
}

/// Returns the last bucket if it matches, otherwise appends a new one.
fn last_or_open<B>(
    buckets: &mut Vec<B>,
    matches: impl Fn(&B) -> bool,
    open: impl FnOnce() -> B,
) -> &mut B {
    if !buckets.last().is_some_and(matches) {
        buckets.push(open());
    }
    let last = buckets.len() - 1;
    &mut buckets[last]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(y: i32, m: u32, d: u32, hour: u32, minutes: i64, notes: &str) -> Record {
        let start = Utc.with_ymd_and_hms(y, m, d, hour, 0, 0).unwrap();
        Record::finished_at(start, start + TimeDelta::minutes(minutes), 1, notes)
    }

    fn assert_week_reconciles(week: &WeeklyBucket) {
        let days: TimeDelta = week.days.iter().map(|day| day.total).sum();
        assert_eq!(week.total, days, "week {}-W{}", week.iso_year, week.week);
    }

    fn assert_month_reconciles(month: &MonthlyBucket) {
        let weeks: TimeDelta = month.weeks.iter().map(|week| week.total).sum();
        assert_eq!(month.total, weeks, "month {}-{}", month.year, month.month);
        month.weeks.iter().for_each(assert_week_reconciles);
    }

    // ========== Weekly Tests ==========

    #[test]
    fn test_week_is_fully_seeded() {
        let records = [record(2024, 8, 21, 9, 30, "")];
        let weeks = records_as_weeks(&records, &Utc);

        assert_eq!(weeks.len(), 1);
        let week = &weeks[0];
        assert_eq!((week.iso_year, week.week), (2024, 34));
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.days[0].date, date(2024, 8, 19));
        assert_eq!(week.days[0].weekday(), Weekday::Mon);
        assert_eq!(week.days[6].date, date(2024, 8, 25));
        assert_eq!(week.days[2].total, TimeDelta::minutes(30));
        assert_eq!(week.active_days(), 1);
    }

    #[test]
    fn test_sunday_is_last_day_of_week() {
        // Aug 25, 2024 is a Sunday
        let records = [record(2024, 8, 25, 9, 60, "")];
        let weeks = records_as_weeks(&records, &Utc);

        assert_eq!(weeks[0].days[0].date, date(2024, 8, 19));
        assert_eq!(weeks[0].days[6].weekday(), Weekday::Sun);
        assert_eq!(weeks[0].days[6].total, TimeDelta::hours(1));
    }

    #[test]
    fn test_same_day_records_accumulate() {
        let records = [
            record(2024, 8, 19, 8, 60, "standup"),
            record(2024, 8, 19, 10, 120, ""),
            record(2024, 8, 19, 14, 15, "review"),
        ];
        let weeks = records_as_weeks(&records, &Utc);

        let monday = &weeks[0].days[0];
        assert_eq!(monday.total, TimeDelta::minutes(195));
        assert_eq!(monday.notes, vec!["standup", "review"]);
        assert_eq!(weeks[0].total, TimeDelta::minutes(195));
    }

    #[test]
    fn test_new_week_opens_on_key_change() {
        let records = [
            record(2024, 12, 27, 9, 60, ""),
            record(2024, 12, 30, 9, 60, ""),
            record(2025, 1, 2, 9, 60, ""),
        ];
        let weeks = records_as_weeks(&records, &Utc);

        assert_eq!(weeks.len(), 2);
        assert_eq!((weeks[0].iso_year, weeks[0].week), (2024, 52));
        assert_eq!((weeks[1].iso_year, weeks[1].week), (2025, 1));
        assert_eq!(weeks[1].total, TimeDelta::hours(2));
        weeks.iter().for_each(assert_week_reconciles);
    }

    #[test]
    fn test_bucketing_uses_local_date() {
        // 23:00 UTC on Sunday is already Monday at UTC+2.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let records = [record(2024, 8, 18, 23, 30, "")];
        let weeks = records_as_weeks(&records, &tz);

        assert_eq!(weeks[0].week, 34);
        assert_eq!(weeks[0].days[0].date, date(2024, 8, 19));
        assert_eq!(weeks[0].days[0].total, TimeDelta::minutes(30));
    }

    #[test]
    fn test_elapsed_time_is_recomputed() {
        let mut stale = record(2024, 8, 19, 8, 60, "");
        stale.duration = TimeDelta::minutes(1);
        let weeks = records_as_weeks(&[stale], &Utc);
        assert_eq!(weeks[0].total, TimeDelta::hours(1));
    }

    #[test]
    fn test_sub_second_precision_is_kept() {
        let start = Utc.with_ymd_and_hms(2024, 8, 19, 8, 0, 0).unwrap();
        let records: Vec<Record> = (0..4)
            .map(|i| {
                let start = start + TimeDelta::minutes(i);
                Record::finished_at(start, start + TimeDelta::milliseconds(600), 1, "")
            })
            .collect();
        let weeks = records_as_weeks(&records, &Utc);
        assert_eq!(weeks[0].total, TimeDelta::milliseconds(2400));
    }

    #[test]
    #[should_panic(expected = "records must be sorted by start")]
    fn test_unsorted_records_panic() {
        let records = [record(2024, 8, 20, 9, 60, ""), record(2024, 8, 19, 9, 60, "")];
        let _ = records_as_weeks(&records, &Utc);
    }

    #[test]
    fn test_no_records_no_buckets() {
        assert!(records_as_weeks(&[], &Utc).is_empty());
        assert!(records_as_months(&[], &Utc).is_empty());
        assert!(records_as_years(&[], &Utc).is_empty());
    }

    // ========== Monthly Tests ==========

    #[test]
    fn test_month_first_week_is_truncated() {
        // May 1, 2024 is a Wednesday
        let month = MonthlyBucket::containing(date(2024, 5, 14));

        assert_eq!(month.first_date, date(2024, 5, 1));
        assert_eq!(month.last_date, date(2024, 5, 31));
        assert_eq!(month.weeks.len(), 5);
        assert_eq!(month.weeks[0].week, 18);
        assert_eq!(month.weeks[0].days.len(), 5);
        assert_eq!(
            month.weeks[0].date_range(),
            Some((date(2024, 5, 1), date(2024, 5, 5)))
        );
        assert_eq!(month.weeks[4].days.len(), 5);
        let days: usize = month.weeks.iter().map(|week| week.days.len()).sum();
        assert_eq!(days, 31);
    }

    #[test]
    fn test_month_starting_monday_has_full_first_week() {
        // Jul 1, 2024 is a Monday
        let month = MonthlyBucket::containing(date(2024, 7, 1));
        assert_eq!(month.weeks[0].days.len(), 7);
        assert_eq!(month.weeks[0].week, 27);
    }

    #[test]
    fn test_january_starts_in_previous_iso_year() {
        // Jan 1-3, 2021 belong to 2020-W53.
        let month = MonthlyBucket::containing(date(2021, 1, 1));
        assert_eq!((month.weeks[0].iso_year, month.weeks[0].week), (2020, 53));
        assert_eq!(month.weeks[0].days.len(), 3);
        assert_eq!((month.weeks[1].iso_year, month.weeks[1].week), (2021, 1));

        let records = [record(2021, 1, 2, 9, 45, ""), record(2021, 1, 4, 9, 30, "")];
        let months = records_as_months(&records, &Utc);
        assert_eq!(months[0].weeks[0].total, TimeDelta::minutes(45));
        assert_eq!(months[0].weeks[1].total, TimeDelta::minutes(30));
        assert_month_reconciles(&months[0]);
    }

    #[test]
    fn test_december_ends_in_next_iso_year() {
        // Dec 30-31, 2024 belong to 2025-W01.
        let month = MonthlyBucket::containing(date(2024, 12, 1));
        let last = month.weeks.last().unwrap();
        assert_eq!((last.iso_year, last.week), (2025, 1));
        assert_eq!(last.days.len(), 2);

        let records = [record(2024, 12, 31, 9, 90, "")];
        let months = records_as_months(&records, &Utc);
        let last = months[0].weeks.last().unwrap();
        assert_eq!(last.total, TimeDelta::minutes(90));
        assert_eq!(last.days[1].total, TimeDelta::minutes(90));
        assert_month_reconciles(&months[0]);
    }

    #[test]
    fn test_leap_february() {
        let month = MonthlyBucket::containing(date(2024, 2, 10));
        assert_eq!(month.last_date, date(2024, 2, 29));
        let days: usize = month.weeks.iter().map(|week| week.days.len()).sum();
        assert_eq!(days, 29);

        let month = MonthlyBucket::containing(date(2023, 2, 10));
        assert_eq!(month.last_date, date(2023, 2, 28));
    }

    #[test]
    fn test_week_split_across_months() {
        // Week 35 of 2024 runs Aug 26 to Sep 1.
        let records = [record(2024, 8, 30, 9, 60, ""), record(2024, 9, 1, 9, 30, "")];
        let months = records_as_months(&records, &Utc);

        assert_eq!(months.len(), 2);
        let august_tail = months[0].weeks.last().unwrap();
        assert_eq!(august_tail.week, 35);
        assert_eq!(august_tail.days.len(), 6);
        assert_eq!(august_tail.total, TimeDelta::hours(1));

        let september_head = &months[1].weeks[0];
        assert_eq!(september_head.week, 35);
        assert_eq!(september_head.days.len(), 1);
        assert_eq!(september_head.total, TimeDelta::minutes(30));
    }

    #[test]
    fn test_month_day_is_counted_once() {
        let records = [record(2024, 5, 2, 9, 60, "planning")];
        let months = records_as_months(&records, &Utc);

        let thursday = &months[0].weeks[0].days[1];
        assert_eq!(thursday.date, date(2024, 5, 2));
        assert_eq!(thursday.total, TimeDelta::hours(1));
        assert_eq!(thursday.notes, vec!["planning"]);
        assert_eq!(months[0].total, TimeDelta::hours(1));
        assert_eq!(months[0].active_days(), 1);
    }

    // ========== Yearly Tests ==========

    #[test]
    fn test_year_is_fully_seeded() {
        let year = YearlyBucket::seeded(2024);
        assert_eq!(year.months.len(), 12);
        assert_eq!(year.months[0].name(), "January");
        assert_eq!(year.months[11].name(), "December");
        let days: usize = year
            .months
            .iter()
            .flat_map(|month| &month.weeks)
            .map(|week| week.days.len())
            .sum();
        assert_eq!(days, 366);
        assert_eq!(year.total, TimeDelta::zero());
    }

    #[test]
    fn test_year_totals_reconcile() {
        let records = [
            record(2024, 1, 1, 9, 60, ""),
            record(2024, 1, 1, 11, 30, ""),
            record(2024, 2, 29, 9, 45, ""),
            record(2024, 8, 19, 8, 60, ""),
            record(2024, 12, 31, 17, 5, ""),
            record(2025, 1, 1, 9, 10, ""),
        ];
        let years = records_as_years(&records, &Utc);

        assert_eq!(years.len(), 2);
        let year = &years[0];
        let months: TimeDelta = year.months.iter().map(|month| month.total).sum();
        assert_eq!(year.total, months);
        assert_eq!(year.total, TimeDelta::minutes(200));
        year.months.iter().for_each(assert_month_reconciles);
        assert_eq!(year.active_days(), 4);
        assert_eq!(years[1].total, TimeDelta::minutes(10));
    }
}
