use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::book::BookRecord;
use super::recommendation::CategoryCount;
use crate::timeline::MonthKey;

/// Headline counts for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySummary {
    pub total_books: u32,
    pub read_books: u32,
    pub unread_books: u32,
    pub owned_books: u32,
    /// Read share of all books in percent, one decimal.
    pub completion_rate: f64,
    /// Reads per calendar month between the first and last dated read.
    pub reading_pace: f64,
    pub top_categories: Vec<CategoryCount>,
    pub recent_books: Vec<BookRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthActivity {
    pub total: u32,
    pub read: u32,
    pub owned: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayCount {
    pub day: String,
    pub count: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakRun {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakSummary {
    /// Size of the last run when it is still open, else 0.
    pub current: u32,
    pub longest: u32,
    /// Runs of more than one read, largest first.
    pub streaks: Vec<StreakRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_since_last_read: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthBreakdown {
    pub added: u32,
    pub read: u32,
    pub completion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyBreakdown {
    pub year: i32,
    pub total_added: u32,
    pub total_read: u32,
    pub completion_rate: f64,
    /// Index 0 is January.
    pub months: [MonthBreakdown; 12],
    pub average_per_month: f64,
    /// 1-based month with the most reads.
    pub peak_month: u32,
    pub peak_month_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTrend {
    pub current_year: u32,
    pub last_year: u32,
    pub change: i64,
    pub percentage_change: f64,
    pub direction: CategoryDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTrends {
    pub current_year: i32,
    pub last_year: i32,
    pub trends: BTreeMap<String, CategoryTrend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_growing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_declined: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearTotals {
    pub year: i32,
    pub total: u32,
    pub read: u32,
    pub categories: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearDifference {
    pub total: i64,
    pub read: i64,
    pub total_percentage: f64,
    pub read_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearComparison {
    pub current: YearTotals,
    pub comparison: YearTotals,
    pub differences: YearDifference,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceForecast {
    pub current_read: u32,
    /// Books per 30.44-day month so far this year.
    pub current_pace: f64,
    pub projected_total: u32,
    pub target_books: u32,
    pub on_track: bool,
    /// Books per month needed over the rest of the year.
    pub required_pace: f64,
    pub remaining_books: u32,
    pub percentage_complete: f64,
    pub days_remaining: u32,
}
