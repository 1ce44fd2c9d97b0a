//! Dashboard summaries over a reading timeline.

use std::collections::BTreeMap;

use chrono::Datelike;

use super::performance::STREAK_GAP_DAYS;
use super::stats::round_to;
use crate::models::{
    BookRecord, CategoryCount, CategoryDirection, CategoryTrend, CategoryTrends, LibrarySummary,
    MonthActivity, MonthBreakdown, PaceForecast, StreakRun, StreakSummary, WeekdayCount,
    YearComparison, YearDifference, YearTotals, YearlyBreakdown,
};
use crate::timeline::{days_between, MonthKey, ReadingTimeline, TimelineEntry};

const TOP_CATEGORIES: usize = 5;
const RECENT_BOOKS: usize = 5;
const DAYS_PER_MONTH: f64 = 30.44;
const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub struct ReadingStatistics<'t, 'a> {
    timeline: &'t ReadingTimeline<'a>,
}

impl<'t, 'a> ReadingStatistics<'t, 'a> {
    pub fn new(timeline: &'t ReadingTimeline<'a>) -> Self {
        Self { timeline }
    }

    pub fn summary(&self) -> LibrarySummary {
        let books = self.timeline.books();
        let total = books.len() as u32;
        let read = books.iter().filter(|b| b.is_read).count() as u32;
        let owned = books.iter().filter(|b| b.is_owned).count() as u32;

        let completion_rate = if total > 0 {
            round_to(read as f64 * 100.0 / total as f64, 1)
        } else {
            0.0
        };

        let mut top_categories: Vec<CategoryCount> = self
            .category_counts()
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect();
        top_categories.sort_by(|a, b| b.count.cmp(&a.count));
        top_categories.truncate(TOP_CATEGORIES);

        let recent_books = self
            .timeline
            .entries()
            .iter()
            .rev()
            .take(RECENT_BOOKS)
            .map(|e| e.book.clone())
            .collect();

        LibrarySummary {
            total_books: total,
            read_books: read,
            unread_books: total - read,
            owned_books: owned,
            completion_rate,
            reading_pace: self.reading_pace(),
            top_categories,
            recent_books,
        }
    }

    /// Dated reads per calendar month between the first and last read.
    pub fn reading_pace(&self) -> f64 {
        let reads: Vec<&TimelineEntry<'a>> = self.timeline.reads().collect();
        let (Some(first), Some(last)) = (reads.first(), reads.last()) else {
            return 0.0;
        };
        let months = first.month_key().months_until(&last.month_key()).max(1);
        round_to(reads.len() as f64 / months as f64, 1)
    }

    pub fn category_counts(&self) -> BTreeMap<String, u32> {
        count_categories(self.timeline.books().iter())
    }

    pub fn monthly_activity(&self) -> BTreeMap<MonthKey, MonthActivity> {
        let mut months: BTreeMap<MonthKey, MonthActivity> = BTreeMap::new();
        for entry in self.timeline.entries() {
            let bucket = months.entry(entry.month_key()).or_default();
            bucket.total += 1;
            if entry.book.is_read {
                bucket.read += 1;
            }
            if entry.book.is_owned {
                bucket.owned += 1;
            }
        }
        months
    }

    /// Dated records per weekday, Sunday first, as a share of all records.
    pub fn weekday_distribution(&self) -> Vec<WeekdayCount> {
        let mut counts = [0u32; 7];
        for entry in self.timeline.entries() {
            counts[entry.at.weekday().num_days_from_sunday() as usize] += 1;
        }
        let total = self.timeline.books().len();

        WEEKDAYS
            .iter()
            .zip(counts)
            .map(|(day, count)| WeekdayCount {
                day: day.to_string(),
                count,
                percentage: if total > 0 {
                    count as f64 * 100.0 / total as f64
                } else {
                    0.0
                },
            })
            .collect()
    }

    pub fn reading_streaks(&self) -> StreakSummary {
        let reads: Vec<&TimelineEntry<'a>> = self.timeline.reads().collect();
        let Some(last) = reads.last() else {
            return StreakSummary::default();
        };

        let mut runs: Vec<StreakRun> = Vec::new();
        let mut current = StreakRun {
            start: reads[0].at,
            end: reads[0].at,
            count: 1,
        };
        for pair in reads.windows(2) {
            if days_between(&pair[0].at, &pair[1].at) <= STREAK_GAP_DAYS {
                current.end = pair[1].at;
                current.count += 1;
            } else {
                let next = StreakRun {
                    start: pair[1].at,
                    end: pair[1].at,
                    count: 1,
                };
                runs.push(std::mem::replace(&mut current, next));
            }
        }
        let open_run = current.count;
        runs.push(current);

        let longest = runs.iter().map(|r| r.count).max().unwrap_or(0);
        let days_since = days_between(&last.at, &self.timeline.as_of());

        let mut streaks: Vec<StreakRun> = runs.into_iter().filter(|r| r.count > 1).collect();
        streaks.sort_by(|a, b| b.count.cmp(&a.count));

        StreakSummary {
            current: if days_since <= STREAK_GAP_DAYS { open_run } else { 0 },
            longest,
            streaks,
            days_since_last_read: Some(days_since),
        }
    }

    /// Month-by-month added/read counts for `year`. `None` for an empty library.
    pub fn yearly_breakdown(&self, year: i32) -> Option<YearlyBreakdown> {
        if self.timeline.books().is_empty() {
            return None;
        }

        let mut months = [MonthBreakdown::default(); 12];
        for entry in self.timeline.entries_in_year(year) {
            let slot = &mut months[entry.at.month0() as usize];
            slot.added += 1;
            if entry.book.is_read {
                slot.read += 1;
            }
        }
        for slot in months.iter_mut() {
            if slot.added > 0 {
                slot.completion = slot.read as f64 * 100.0 / slot.added as f64;
            }
        }

        let total_added: u32 = months.iter().map(|m| m.added).sum();
        let total_read: u32 = months.iter().map(|m| m.read).sum();

        let (mut peak_month, mut peak_month_count) = (1, 0);
        for (i, slot) in months.iter().enumerate() {
            if slot.read > peak_month_count {
                peak_month = i as u32 + 1;
                peak_month_count = slot.read;
            }
        }

        Some(YearlyBreakdown {
            year,
            total_added,
            total_read,
            completion_rate: if total_added > 0 {
                total_read as f64 * 100.0 / total_added as f64
            } else {
                0.0
            },
            months,
            average_per_month: total_read as f64 / 12.0,
            peak_month,
            peak_month_count,
        })
    }

    /// Category counts this year against last year.
    pub fn category_trends(&self) -> CategoryTrends {
        let current_year = self.timeline.current_year();
        let last_year = current_year - 1;
        let current = count_categories(self.timeline.entries_in_year(current_year).map(|e| e.book));
        let previous = count_categories(self.timeline.entries_in_year(last_year).map(|e| e.book));

        let mut trends = BTreeMap::new();
        for category in current.keys().chain(previous.keys()) {
            if trends.contains_key(category) {
                continue;
            }
            let now = current.get(category).copied().unwrap_or(0);
            let before = previous.get(category).copied().unwrap_or(0);
            let change = now as i64 - before as i64;
            let percentage_change = if before > 0 {
                round_to(change as f64 * 100.0 / before as f64, 1)
            } else if now > 0 {
                100.0
            } else {
                0.0
            };
            let direction = match change {
                c if c > 0 => CategoryDirection::Increasing,
                c if c < 0 => CategoryDirection::Decreasing,
                _ => CategoryDirection::Stable,
            };
            trends.insert(
                category.clone(),
                CategoryTrend {
                    current_year: now,
                    last_year: before,
                    change,
                    percentage_change,
                    direction,
                },
            );
        }

        let mut fastest_growing: Option<(&String, f64)> = None;
        let mut most_declined: Option<(&String, f64)> = None;
        for (category, trend) in &trends {
            if trend.change > 0 && fastest_growing.is_none_or(|(_, p)| trend.percentage_change > p) {
                fastest_growing = Some((category, trend.percentage_change));
            }
            if trend.change < 0 && most_declined.is_none_or(|(_, p)| trend.percentage_change < p) {
                most_declined = Some((category, trend.percentage_change));
            }
        }

        CategoryTrends {
            current_year,
            last_year,
            fastest_growing: fastest_growing.map(|(c, _)| c.clone()),
            most_declined: most_declined.map(|(c, _)| c.clone()),
            trends,
        }
    }

    /// This year against `other_year`. `None` for an empty library.
    pub fn compare_years(&self, other_year: i32) -> Option<YearComparison> {
        if self.timeline.books().is_empty() {
            return None;
        }

        let current = self.year_totals(self.timeline.current_year());
        let comparison = self.year_totals(other_year);
        let percent_diff = |now: u32, base: u32| {
            if base > 0 {
                (now as f64 - base as f64) * 100.0 / base as f64
            } else {
                0.0
            }
        };

        let differences = YearDifference {
            total: current.total as i64 - comparison.total as i64,
            read: current.read as i64 - comparison.read as i64,
            total_percentage: percent_diff(current.total, comparison.total),
            read_percentage: percent_diff(current.read, comparison.read),
        };

        Some(YearComparison {
            current,
            comparison,
            differences,
        })
    }

    fn year_totals(&self, year: i32) -> YearTotals {
        let entries: Vec<&TimelineEntry<'a>> = self.timeline.entries_in_year(year).collect();
        YearTotals {
            year,
            total: entries.len() as u32,
            read: entries.iter().filter(|e| e.book.is_read).count() as u32,
            categories: count_categories(entries.iter().map(|e| e.book)),
        }
    }

    /// Where this year's reading is headed relative to `target`.
    pub fn pace_forecast(&self, target: u32) -> PaceForecast {
        let year = self.timeline.current_year();
        let current_read = self.timeline.reads_in_year(year).count() as u32;
        let days_passed = days_between(&self.timeline.year_start(), &self.timeline.as_of()).max(0) as u32;
        let days_remaining = self.timeline.days_in_year().saturating_sub(days_passed);
        let remaining_books = target.saturating_sub(current_read);

        let current_pace = if days_passed > 0 {
            current_read as f64 / (days_passed as f64 / DAYS_PER_MONTH)
        } else {
            0.0
        };
        let projected_total = (current_pace * 12.0).round() as u32;
        let required_pace = if days_remaining > 0 {
            remaining_books as f64 / (days_remaining as f64 / DAYS_PER_MONTH)
        } else {
            remaining_books as f64
        };

        PaceForecast {
            current_read,
            current_pace: round_to(current_pace, 1),
            projected_total,
            target_books: target,
            on_track: projected_total >= target,
            required_pace: round_to(required_pace, 1),
            remaining_books,
            percentage_complete: if target > 0 {
                current_read as f64 * 100.0 / target as f64
            } else {
                0.0
            },
            days_remaining,
        }
    }
}

fn count_categories<'b>(books: impl Iterator<Item = &'b BookRecord>) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for book in books {
        *counts.entry(book.category_or_default().to_string()).or_insert(0) += 1;
    }
    counts
}
