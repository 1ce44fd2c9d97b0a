//! One-time normalization of book timestamps.
//!
//! Every analysis starts by turning the raw book list into a
//! [`ReadingTimeline`]: dated records converted to local wall-clock time with
//! the configured offset and sorted ascending, plus the local reference time
//! (`as_of`) that defines "this year" and "this month".

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::models::BookRecord;

// ─── MonthKey ───────────────────────────────────────────────

/// Calendar month bucket, rendered as `"YYYY-MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    pub year: i32,
    /// 1-based month.
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(at: &NaiveDateTime) -> Self {
        Self::new(at.year(), at.month())
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    /// Months from `self` to `later` (negative when `later` is earlier).
    pub fn months_until(&self, later: &MonthKey) -> i32 {
        (later.year - self.year) * 12 + (later.month as i32 - self.month as i32)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: {s}"))?;
        let year: i32 = year.parse().map_err(|_| format!("Invalid month key: {s}"))?;
        let month: u32 = month.parse().map_err(|_| format!("Invalid month key: {s}"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("Invalid month key: {s}"));
        }
        Ok(Self::new(year, month))
    }
}

impl TryFrom<String> for MonthKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

// ─── Timeline ───────────────────────────────────────────────

/// A dated book record with its local timestamp.
#[derive(Debug, Clone, Copy)]
pub struct TimelineEntry<'a> {
    pub at: NaiveDateTime,
    pub book: &'a BookRecord,
}

impl TimelineEntry<'_> {
    pub fn month_key(&self) -> MonthKey {
        MonthKey::of(&self.at)
    }
}

#[derive(Debug, Clone)]
pub struct ReadingTimeline<'a> {
    books: &'a [BookRecord],
    as_of: NaiveDateTime,
    entries: Vec<TimelineEntry<'a>>,
}

impl<'a> ReadingTimeline<'a> {
    pub fn new(books: &'a [BookRecord], as_of: DateTime<Utc>, offset: FixedOffset) -> Self {
        let mut entries: Vec<TimelineEntry<'a>> = books
            .iter()
            .filter_map(|book| {
                book.created_at.map(|created| TimelineEntry {
                    at: created.with_timezone(&offset).naive_local(),
                    book,
                })
            })
            .collect();
        // Stable: records sharing a timestamp keep their input order.
        entries.sort_by_key(|e| e.at);

        Self {
            books,
            as_of: as_of.with_timezone(&offset).naive_local(),
            entries,
        }
    }

    pub fn with_config(books: &'a [BookRecord], as_of: DateTime<Utc>, config: &TimelineConfig) -> Self {
        Self::new(books, as_of, offset_from_minutes(config.utc_offset_minutes))
    }

    /// Timeline in UTC as of now.
    pub fn now(books: &'a [BookRecord]) -> Self {
        Self::new(books, Utc::now(), Utc.fix())
    }

    /// Every record, dated or not.
    pub fn books(&self) -> &'a [BookRecord] {
        self.books
    }

    pub fn as_of(&self) -> NaiveDateTime {
        self.as_of
    }

    pub fn current_year(&self) -> i32 {
        self.as_of.year()
    }

    /// 1-based month of `as_of`, i.e. the number of months elapsed this year.
    pub fn current_month(&self) -> u32 {
        self.as_of.month()
    }

    pub fn current_month_key(&self) -> MonthKey {
        MonthKey::of(&self.as_of)
    }

    /// All dated records, oldest first.
    pub fn entries(&self) -> &[TimelineEntry<'a>] {
        &self.entries
    }

    /// The read set: read records with a timestamp, oldest first.
    pub fn reads(&self) -> impl Iterator<Item = &TimelineEntry<'a>> + '_ {
        self.entries.iter().filter(|e| e.book.is_read)
    }

    pub fn read_count(&self) -> usize {
        self.reads().count()
    }

    pub fn entries_in_year(&self, year: i32) -> impl Iterator<Item = &TimelineEntry<'a>> + '_ {
        self.entries.iter().filter(move |e| e.at.year() == year)
    }

    pub fn reads_in_year(&self, year: i32) -> impl Iterator<Item = &TimelineEntry<'a>> + '_ {
        self.reads().filter(move |e| e.at.year() == year)
    }

    /// Read counts per calendar month, only for months with at least one read.
    pub fn monthly_read_counts(&self) -> BTreeMap<MonthKey, u32> {
        let mut counts = BTreeMap::new();
        for entry in self.reads() {
            *counts.entry(entry.month_key()).or_insert(0) += 1;
        }
        counts
    }

    /// Whole months between the first and last read, using 30.44-day months.
    pub fn read_span_months(&self) -> u32 {
        let mut reads = self.reads();
        let Some(first) = reads.next() else {
            return 0;
        };
        let Some(last) = reads.last() else {
            return 0;
        };
        let days = (last.at - first.at).num_seconds() as f64 / 86_400.0;
        (days / 30.44).round().max(0.0) as u32
    }

    /// Start of the `as_of` year at local midnight.
    pub fn year_start(&self) -> NaiveDateTime {
        self.as_of
            .date()
            .with_ordinal(1)
            .unwrap_or(self.as_of.date())
            .and_hms_opt(0, 0, 0)
            .unwrap_or(self.as_of)
    }

    /// Number of days in the `as_of` year (365 or 366).
    pub fn days_in_year(&self) -> u32 {
        if self.as_of.date().leap_year() { 366 } else { 365 }
    }

    /// Number of days in the `as_of` month.
    pub fn days_in_month(&self) -> u32 {
        let first = self.as_of.date().with_day(1).unwrap_or(self.as_of.date());
        first
            .checked_add_months(Months::new(1))
            .map(|next| (next - first).num_days() as u32)
            .unwrap_or(31)
    }
}

pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
}

/// Whole days from `earlier` to `later`, truncated.
pub fn days_between(earlier: &NaiveDateTime, later: &NaiveDateTime) -> i64 {
    (*later - *earlier).num_days()
}
