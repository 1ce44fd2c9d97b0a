use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::timeline::MonthKey;

/// The four bounded habit scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    /// 0–100.
    pub consistency: u32,
    /// 0–100.
    pub variety: u32,
    /// 0–200, 100 means exactly on schedule.
    pub progress: u32,
    /// Books per elapsed week this year, one decimal.
    pub velocity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvicePriority {
    High,
    Medium,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceTopic {
    Consistency,
    Variety,
    Progress,
    Velocity,
    Excellence,
}

/// A rule-based improvement suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub topic: AdviceTopic,
    pub title: String,
    pub description: String,
    pub priority: AdvicePriority,
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRecord {
    pub year: i32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRecord {
    pub month: MonthKey,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalBests {
    pub best_year: Option<YearRecord>,
    pub best_month: Option<MonthRecord>,
    pub longest_streak: Streak,
    pub total_books_read: u32,
    pub first_read_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalStatus {
    pub target: u32,
    pub current: u32,
    pub percentage: f64,
    pub on_track: bool,
    pub remaining: u32,
    /// Elapsed share of the period, in percent.
    pub time_progress: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub yearly: GoalStatus,
    pub monthly: GoalStatus,
}

/// Everything [`crate::PerformanceScorer`] produces in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub scores: ScoreSet,
    pub advice: Vec<Advice>,
    pub personal_bests: PersonalBests,
    pub goal_progress: GoalProgress,
    pub total_books_this_year: u32,
    pub read_books_this_year: u32,
    pub completion_rate: f64,
}
