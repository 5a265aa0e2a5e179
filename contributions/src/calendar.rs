use crate::errors::{ContributionsError, Result};
use crate::model::{ActivityKind, Contribution, DayCounts};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;

pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 9999;

/// Inclusive UTC range covering one calendar year.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    year: i32,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Jan 1 00:00:00 to Dec 31 23:59:59, UTC.
    pub fn year(year: i32) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(ContributionsError::InvalidYear(year));
        }

        let from = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or(ContributionsError::InvalidYear(year))?;
        let to = NaiveDate::from_ymd_opt(year, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .ok_or(ContributionsError::InvalidYear(year))?;

        Ok(DateRange {
            year,
            from: from.and_utc(),
            to: to.and_utc(),
        })
    }

    pub fn year_number(&self) -> i32 {
        self.year
    }

    pub fn year_label(&self) -> String {
        self.year.to_string()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date.year() == self.year
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        days_in_year(self.year)
    }
}

/// Every calendar day of `year`, in order.
pub fn days_in_year(year: i32) -> impl Iterator<Item = NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .into_iter()
        .flat_map(|first| first.iter_days())
        .take_while(move |day| day.year() == year)
}

/// Zero-filled day map for one year.
///
/// Days outside the year are ignored, so a sloppy upstream cannot grow the calendar.
#[derive(Debug)]
pub struct YearCalendar {
    range: DateRange,
    days: BTreeMap<NaiveDate, Contribution>,
}

impl YearCalendar {
    pub fn new(range: DateRange) -> Self {
        let days = range.days().map(|d| (d, Contribution::empty(d))).collect();
        YearCalendar { range, days }
    }

    pub fn range(&self) -> &DateRange {
        &self.range
    }

    /// Adds `count` to the day. With `kind` the count is also recorded in the day's activity
    /// detail.
    pub fn add(&mut self, date: NaiveDate, count: u64, kind: Option<ActivityKind>) {
        if count == 0 {
            return;
        }
        let Some(day) = self.days.get_mut(&date) else {
            return;
        };

        day.count += count;
        if let Some(kind) = kind {
            *day.activity
                .get_or_insert_with(BTreeMap::new)
                .entry(kind)
                .or_default() += count;
        }
    }

    pub fn add_counts(&mut self, counts: &DayCounts, kind: Option<ActivityKind>) {
        for (date, count) in counts.iter() {
            self.add(date, count, kind);
        }
    }

    pub fn total(&self) -> u64 {
        self.days.values().map(|d| d.count).sum()
    }

    /// Sorted by date ascending.
    pub fn into_contributions(self) -> Vec<Contribution> {
        self.days.into_values().collect()
    }
}
