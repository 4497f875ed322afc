//! Calendar-week helpers
//!
//! Timestamps are stored as epoch milliseconds; everything the user sees is a
//! local calendar date. Weeks run Monday through Sunday, both inclusive.

use chrono::{Datelike, Days, Local, NaiveDate, TimeZone};

use crate::models::DiaryEntry;

/// A Monday–Sunday calendar week
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Week {
    /// Monday
    pub start: NaiveDate,
    /// Sunday
    pub end: NaiveDate,
}

impl Week {
    /// Whether `date` falls inside the week
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        (self.start..=self.end).contains(&date)
    }

    /// The seven dates of the week, Monday first
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(7)
    }
}

/// The week containing `today`
///
/// At the edges of the representable calendar the week is clipped to
/// [`NaiveDate::MIN`] or [`NaiveDate::MAX`].
#[must_use]
pub fn week_of(today: NaiveDate) -> Week {
    let start = today
        .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
        .unwrap_or(NaiveDate::MIN);
    Week {
        start,
        end: start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX),
    }
}

/// Calendar date of an epoch-millisecond timestamp in `tz`
pub fn local_date<Tz: TimeZone>(millis: i64, tz: &Tz) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(millis).earliest().map(|dt| dt.date_naive())
}

/// Entries created during the week of `today`, in their original order
pub fn entries_in_week<'a, Tz: TimeZone>(entries: &'a [DiaryEntry], today: NaiveDate, tz: &Tz) -> Vec<&'a DiaryEntry> {
    let week = week_of(today);
    entries
        .iter()
        .filter(|entry| local_date(entry.created_at, tz).is_some_and(|date| week.contains(date)))
        .collect()
}

/// Days of the current week that have at least one entry, sorted
pub fn active_days<Tz: TimeZone>(entries: &[DiaryEntry], today: NaiveDate, tz: &Tz) -> Vec<NaiveDate> {
    let mut days: Vec<NaiveDate> = entries_in_week(entries, today, tz)
        .into_iter()
        .filter_map(|entry| local_date(entry.created_at, tz))
        .collect();
    days.sort_unstable();
    days.dedup();
    days
}

/// Short display date, `yy.MM.dd`
pub fn format_entry_date<Tz: TimeZone>(millis: i64, tz: &Tz) -> String {
    local_date(millis, tz).map_or_else(String::new, |date| date.format("%y.%m.%d").to_string())
}

/// Today's date in the system time zone
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
