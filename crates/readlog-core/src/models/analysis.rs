use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::timeline::MonthKey;

// ─── Patterns ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    TimeBased,
    CategoryBased,
    VolumeBased,
    Consistency,
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeBased => write!(f, "time_based"),
            Self::CategoryBased => write!(f, "category_based"),
            Self::VolumeBased => write!(f, "volume_based"),
            Self::Consistency => write!(f, "consistency"),
        }
    }
}

/// A classified behavioral pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    pub subtype: String,
    /// Heuristic detector certainty in `[0, 1]`.
    pub confidence: f64,
    pub description: String,
    pub data: PatternData,
}

/// Detector-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternData {
    Time {
        peak_hour: u32,
        peak_day: String,
        hourly_distribution: Vec<u32>,
        weekly_distribution: Vec<u32>,
    },
    Category {
        primary_category: String,
        primary_ratio: f64,
        category_distribution: BTreeMap<String, u32>,
        diversity_index: usize,
    },
    Volume {
        average_monthly_volume: f64,
        variability: f64,
        monthly_data: BTreeMap<MonthKey, u32>,
    },
    Consistency {
        average_gap_days: f64,
        max_gap_days: i64,
        consistency_score: f64,
        total_gaps: usize,
    },
    Empty {},
}

// ─── Seasonality ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalStrength {
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub strength: SeasonalStrength,
    /// 1-based months with index above 1.2.
    pub peak_months: Vec<u32>,
    /// 1-based months with index below 0.8.
    pub low_months: Vec<u32>,
    /// Per-month count divided by the overall monthly average, January first.
    pub seasonality_index: [f64; 12],
    pub monthly_data: [u32; 12],
    pub description: String,
}

// ─── Anomalies ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyKind {
    Spike,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub month: MonthKey,
    pub volume: u32,
    pub z_score: f64,
    pub description: String,
}

// ─── Trend & prediction ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub slope: f64,
    pub r_squared: f64,
    /// Monthly read counts the line was fitted to, oldest first.
    pub recent_data: Vec<u32>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub year_end_estimate: u32,
    pub confidence: f64,
    pub monthly_pace: f64,
    pub remaining_months: u32,
    pub current_progress: u32,
    pub description: String,
}

/// Everything [`crate::PatternAnalyzer`] produces in one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub patterns: Vec<Pattern>,
    pub seasonality: Option<Seasonality>,
    pub anomalies: Vec<Anomaly>,
    pub trend: Option<Trend>,
    pub prediction: Option<Prediction>,
}
