//! Behavioral pattern classification, seasonality, anomalies, trends and
//! year-end forecasting over the read set.
//!
//! Every method is total: insufficient data yields `None` or an empty list.

use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};

use super::stats::{argmax, linear_fit, mean, round_to, std_dev};
use crate::models::{
    Anomaly, AnomalyKind, Pattern, PatternData, PatternKind, PatternReport, Prediction,
    SeasonalStrength, Seasonality, Trend, TrendDirection,
};
use crate::timeline::{days_between, ReadingTimeline, TimelineEntry};

/// Patterns at or below this confidence are dropped by [`PatternAnalyzer::classify_reading_patterns`].
pub const PATTERN_CONFIDENCE_THRESHOLD: f64 = 0.5;
pub const MIN_READS_FOR_SEASONALITY: usize = 12;
pub const MIN_READS_FOR_TREND: usize = 6;
pub const MIN_READS_FOR_PREDICTION: usize = 12;
pub const MIN_MONTHS_FOR_ANOMALIES: usize = 3;
pub const ANOMALY_Z_THRESHOLD: f64 = 2.0;
const TREND_WINDOW: usize = 6;

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub struct PatternAnalyzer<'t, 'a> {
    timeline: &'t ReadingTimeline<'a>,
    reads: Vec<&'t TimelineEntry<'a>>,
}

impl<'t, 'a> PatternAnalyzer<'t, 'a> {
    pub fn new(timeline: &'t ReadingTimeline<'a>) -> Self {
        Self {
            timeline,
            reads: timeline.reads().collect(),
        }
    }

    /// Run every detector. An empty read set yields an empty report.
    pub fn analyze(&self) -> PatternReport {
        if self.reads.is_empty() {
            return PatternReport::default();
        }

        PatternReport {
            patterns: self.classify_reading_patterns(),
            seasonality: self.detect_seasonality(),
            anomalies: self.detect_anomalies(),
            trend: self.analyze_trends(),
            prediction: self.generate_predictions(),
        }
    }

    /// Patterns with confidence above [`PATTERN_CONFIDENCE_THRESHOLD`].
    pub fn classify_reading_patterns(&self) -> Vec<Pattern> {
        if self.reads.is_empty() {
            return Vec::new();
        }

        [
            self.time_based_pattern(),
            self.category_pattern(),
            self.volume_pattern(),
            self.consistency_pattern(),
        ]
        .into_iter()
        .filter(|p| p.confidence > PATTERN_CONFIDENCE_THRESHOLD)
        .collect()
    }

    pub fn time_based_pattern(&self) -> Pattern {
        let mut hourly = vec![0u32; 24];
        let mut weekly = vec![0u32; 7];
        for entry in &self.reads {
            hourly[entry.at.hour() as usize] += 1;
            weekly[entry.at.weekday().num_days_from_sunday() as usize] += 1;
        }

        let peak_hour = argmax(&hourly).unwrap_or(0) as u32;
        let peak_day = WEEKDAYS[argmax(&weekly).unwrap_or(0)];

        let (subtype, confidence) = match peak_hour {
            6..=10 => ("morning", 0.8),
            19..=23 => ("evening", 0.8),
            11..=14 => ("afternoon", 0.7),
            _ => ("unknown", 0.0),
        };

        Pattern {
            kind: PatternKind::TimeBased,
            subtype: subtype.to_string(),
            confidence,
            description: format!("Mostly reads around {peak_hour}:00, most often on {peak_day}"),
            data: PatternData::Time {
                peak_hour,
                peak_day: peak_day.to_string(),
                hourly_distribution: hourly,
                weekly_distribution: weekly,
            },
        }
    }

    pub fn category_pattern(&self) -> Pattern {
        let mut distribution: BTreeMap<String, u32> = BTreeMap::new();
        for entry in &self.reads {
            *distribution
                .entry(entry.book.category_or_default().to_string())
                .or_insert(0) += 1;
        }

        let total = self.reads.len().max(1) as f64;
        // Highest count; ties go to the alphabetically first category.
        let (primary, top_count) = distribution
            .iter()
            .fold((String::new(), 0u32), |best, (cat, &count)| {
                if count > best.1 { (cat.clone(), count) } else { best }
            });
        let ratio = top_count as f64 / total;

        let (subtype, confidence) = if ratio > 0.6 {
            ("specialist", 0.9)
        } else if ratio > 0.4 {
            ("focused", 0.8)
        } else if distribution.len() >= 5 {
            ("diverse", 0.9)
        } else {
            ("diverse", 0.6)
        };

        let percentage = (ratio * 100.0).round();
        let description = match subtype {
            "specialist" => format!("Specialist reader of {primary} ({percentage}% of reads)"),
            "focused" => format!("Reading centers on {primary} ({percentage}% of reads)"),
            _ => "Reads widely across many categories".to_string(),
        };

        Pattern {
            kind: PatternKind::CategoryBased,
            subtype: subtype.to_string(),
            confidence,
            description,
            data: PatternData::Category {
                primary_category: primary,
                primary_ratio: ratio,
                diversity_index: distribution.len(),
                category_distribution: distribution,
            },
        }
    }

    pub fn volume_pattern(&self) -> Pattern {
        let monthly = self.timeline.monthly_read_counts();
        let volumes: Vec<f64> = monthly.values().map(|&v| v as f64).collect();
        let avg = mean(&volumes);
        let cv = if avg > 0.0 { std_dev(&volumes) / avg } else { 0.0 };

        let (subtype, confidence) = if cv < 0.3 {
            ("steady", 0.9)
        } else if cv < 0.6 {
            ("moderate", 0.8)
        } else {
            ("irregular", 0.7)
        };

        let avg_rounded = round_to(avg, 1);
        let description = match subtype {
            "steady" => format!("Steady reading pace ({avg_rounded} books per month)"),
            "moderate" => format!("Somewhat variable reading pace ({avg_rounded} books per month)"),
            _ => format!("Irregular reading volume ({avg_rounded} books per month)"),
        };

        Pattern {
            kind: PatternKind::VolumeBased,
            subtype: subtype.to_string(),
            confidence,
            description,
            data: PatternData::Volume {
                average_monthly_volume: avg_rounded,
                variability: cv,
                monthly_data: monthly,
            },
        }
    }

    pub fn consistency_pattern(&self) -> Pattern {
        let gaps: Vec<i64> = self
            .reads
            .windows(2)
            .map(|pair| days_between(&pair[0].at, &pair[1].at))
            .collect();

        if gaps.is_empty() {
            return Pattern {
                kind: PatternKind::Consistency,
                subtype: "insufficient_data".to_string(),
                confidence: 0.1,
                description: "Not enough dated reads to judge consistency".to_string(),
                data: PatternData::Empty {},
            };
        }

        let avg_gap = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
        let max_gap = gaps.iter().copied().max().unwrap_or(0);
        let score = 1.0 - (max_gap as f64 - avg_gap) / max_gap.max(1) as f64;

        let (subtype, confidence) = if score > 0.8 && avg_gap <= 7.0 {
            ("very_consistent", 0.95)
        } else if score > 0.6 && avg_gap <= 14.0 {
            ("consistent", 0.8)
        } else if avg_gap <= 30.0 {
            ("moderate", 0.7)
        } else {
            ("irregular", 0.7)
        };

        let days = avg_gap.round();
        let description = match subtype {
            "very_consistent" => format!("Very regular reading habit (every {days} days on average)"),
            "consistent" => format!("Regular reading habit (every {days} days on average)"),
            "moderate" => format!("Fairly regular reading habit (every {days} days on average)"),
            _ => format!("Irregular reading habit (every {days} days on average)"),
        };

        Pattern {
            kind: PatternKind::Consistency,
            subtype: subtype.to_string(),
            confidence,
            description,
            data: PatternData::Consistency {
                average_gap_days: days,
                max_gap_days: max_gap,
                consistency_score: round_to(score, 2),
                total_gaps: gaps.len(),
            },
        }
    }

    /// Month-of-year seasonality over the whole history.
    pub fn detect_seasonality(&self) -> Option<Seasonality> {
        if self.reads.len() < MIN_READS_FOR_SEASONALITY {
            return None;
        }

        let mut monthly = [0u32; 12];
        for entry in &self.reads {
            monthly[entry.at.month0() as usize] += 1;
        }

        let average = self.reads.len() as f64 / 12.0;
        let index: [f64; 12] = monthly.map(|count| count as f64 / average);
        let max = index.iter().copied().fold(f64::MIN, f64::max);
        let min = index.iter().copied().fold(f64::MAX, f64::min);
        let spread = max - min;

        if spread < 0.5 {
            return Some(Seasonality {
                strength: SeasonalStrength::Weak,
                peak_months: Vec::new(),
                low_months: Vec::new(),
                seasonality_index: index,
                monthly_data: monthly,
                description: "No clear seasonal pattern".to_string(),
            });
        }

        let months_where = |pred: fn(f64) -> bool| -> Vec<u32> {
            index
                .iter()
                .enumerate()
                .filter(|(_, i)| pred(**i))
                .map(|(m, _)| m as u32 + 1)
                .collect()
        };
        let peak_months = months_where(|i| i > 1.2);
        let low_months = months_where(|i| i < 0.8);

        Some(Seasonality {
            strength: if spread > 1.0 {
                SeasonalStrength::Strong
            } else {
                SeasonalStrength::Moderate
            },
            description: seasonality_description(&peak_months, &low_months),
            peak_months,
            low_months,
            seasonality_index: index,
            monthly_data: monthly,
        })
    }

    /// Calendar months whose volume is more than two standard deviations from the mean.
    pub fn detect_anomalies(&self) -> Vec<Anomaly> {
        let monthly = self.timeline.monthly_read_counts();
        if monthly.len() < MIN_MONTHS_FOR_ANOMALIES {
            return Vec::new();
        }

        let volumes: Vec<f64> = monthly.values().map(|&v| v as f64).collect();
        let avg = mean(&volumes);
        let sd = std_dev(&volumes);
        if sd == 0.0 {
            return Vec::new();
        }

        let mut anomalies: Vec<Anomaly> = monthly
            .into_iter()
            .filter_map(|(month, volume)| {
                let z = (volume as f64 - avg).abs() / sd;
                if z <= ANOMALY_Z_THRESHOLD {
                    return None;
                }
                let (kind, description) = if volume as f64 > avg {
                    (AnomalyKind::Spike, format!("Read more than usual in {month} ({volume} books)"))
                } else {
                    (AnomalyKind::Drop, format!("Read less than usual in {month} ({volume} books)"))
                };
                Some(Anomaly {
                    kind,
                    month,
                    volume,
                    z_score: z,
                    description,
                })
            })
            .collect();

        // Stable: equal scores stay in chronological order.
        anomalies.sort_by(|a, b| b.z_score.total_cmp(&a.z_score));
        anomalies
    }

    /// Least-squares trend over the last six active months.
    pub fn analyze_trends(&self) -> Option<Trend> {
        if self.reads.len() < MIN_READS_FOR_TREND {
            return None;
        }

        let monthly = self.timeline.monthly_read_counts();
        let skip = monthly.len().saturating_sub(TREND_WINDOW);
        let recent: Vec<u32> = monthly.values().skip(skip).copied().collect();
        let fit = linear_fit(&recent.iter().map(|&v| v as f64).collect::<Vec<_>>());

        let direction = if fit.slope > 0.1 {
            TrendDirection::Increasing
        } else if fit.slope < -0.1 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        Some(Trend {
            direction,
            slope: fit.slope,
            r_squared: fit.r_squared,
            recent_data: recent,
            description: trend_description(fit.slope).to_string(),
        })
    }

    /// Year-end estimate for the `as_of` year, seasonally adjusted when possible.
    pub fn generate_predictions(&self) -> Option<Prediction> {
        if self.reads.len() < MIN_READS_FOR_PREDICTION {
            return None;
        }

        let current_year = self.timeline.current_year();
        let months_elapsed = self.timeline.current_month();
        let year_count = self
            .reads
            .iter()
            .filter(|e| e.at.year() == current_year)
            .count() as f64;

        let pace = year_count / months_elapsed.max(1) as f64;
        let remaining = 12 - months_elapsed.min(12);
        let mut estimate = pace * 12.0;

        if let Some(seasonality) = self.detect_seasonality()
            && seasonality.strength != SeasonalStrength::Weak
        {
            let rest = &seasonality.seasonality_index[months_elapsed.min(12) as usize..];
            let rest_factor = if rest.is_empty() { 1.0 } else { mean(rest) };
            estimate = year_count + pace * remaining as f64 * rest_factor;
        }

        let estimate = estimate.round().max(0.0) as u32;
        Some(Prediction {
            year_end_estimate: estimate,
            confidence: self.prediction_confidence(),
            monthly_pace: round_to(pace, 1),
            remaining_months: remaining,
            current_progress: year_count as u32,
            description: format!("At the current pace you will finish about {estimate} books this year"),
        })
    }

    fn prediction_confidence(&self) -> f64 {
        let points = self.reads.len();
        let span = self.timeline.read_span_months();

        if points >= 50 && span >= 12 {
            0.9
        } else if points >= 30 && span >= 6 {
            0.8
        } else if points >= 15 && span >= 3 {
            0.7
        } else if points >= 10 {
            0.6
        } else {
            0.5
        }
    }
}

fn seasonality_description(peaks: &[u32], lows: &[u32]) -> String {
    let names = |months: &[u32]| -> String {
        months
            .iter()
            .map(|&m| MONTH_NAMES[(m - 1) as usize])
            .collect::<Vec<_>>()
            .join(", ")
    };

    match (peaks.is_empty(), lows.is_empty()) {
        (false, false) => format!("Most active in {}, quietest in {}", names(peaks), names(lows)),
        (false, true) => format!("Most active in {}", names(peaks)),
        (true, false) => format!("Reading drops off in {}", names(lows)),
        (true, true) => "Seasonal pattern still forming".to_string(),
    }
}

fn trend_description(slope: f64) -> &'static str {
    if slope > 0.3 {
        "Reading volume is rising"
    } else if slope > 0.1 {
        "Reading volume is rising slowly"
    } else if slope < -0.3 {
        "Reading volume is falling"
    } else if slope < -0.1 {
        "Reading volume is falling slowly"
    } else {
        "Reading volume is stable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookRecord;
    use crate::timeline::fixtures::*;
    use chrono::{Offset, Utc};

    fn timeline(books: &[BookRecord]) -> ReadingTimeline<'_> {
        ReadingTimeline::new(books, at(2024, 6, 15, 12), Utc.fix())
    }

    #[test]
    fn test_empty_read_set_yields_empty_report() {
        let books = vec![BookRecord::new("Unread").with_created_at(at(2024, 1, 1, 9))];
        let tl = timeline(&books);
        let report = PatternAnalyzer::new(&tl).analyze();
        assert_eq!(report, PatternReport::default());
    }

    #[test]
    fn test_single_read_is_insufficient_for_everything_temporal() {
        let books = vec![read_book("Only", "Science", at(2024, 2, 1, 9))];
        let tl = timeline(&books);
        let analyzer = PatternAnalyzer::new(&tl);

        assert!(analyzer.detect_seasonality().is_none());
        assert!(analyzer.analyze_trends().is_none());
        assert!(analyzer.generate_predictions().is_none());

        let consistency = analyzer.consistency_pattern();
        assert_eq!(consistency.subtype, "insufficient_data");
        assert_eq!(consistency.confidence, 0.1);
        assert_eq!(consistency.data, PatternData::Empty {});
    }

    #[test]
    fn test_three_science_books_make_a_specialist() {
        let books = vec![
            read_book("A", "Science", at(2024, 1, 3, 8)),
            read_book("B", "Science", at(2024, 2, 3, 8)),
            read_book("C", "Science", at(2024, 3, 3, 8)),
        ];
        let tl = timeline(&books);
        let patterns = PatternAnalyzer::new(&tl).classify_reading_patterns();

        let category = patterns
            .iter()
            .find(|p| p.kind == PatternKind::CategoryBased)
            .expect("category pattern");
        assert_eq!(category.subtype, "specialist");
        assert_eq!(category.confidence, 0.9);
        match &category.data {
            PatternData::Category { primary_ratio, primary_category, .. } => {
                assert_eq!(*primary_ratio, 1.0);
                assert_eq!(primary_category, "Science");
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_category_focus_levels() {
        let cats = ["A", "B", "C", "D", "E"];
        let books: Vec<BookRecord> = cats
            .iter()
            .enumerate()
            .map(|(i, c)| read_book(&format!("Book {i}"), c, at(2024, 1, 1 + i as u32, 9)))
            .collect();
        let tl = timeline(&books);
        let pattern = PatternAnalyzer::new(&tl).category_pattern();
        assert_eq!(pattern.subtype, "diverse");
        assert_eq!(pattern.confidence, 0.9);

        let mut books = books;
        books.push(read_book("Extra A", "A", at(2024, 2, 1, 9)));
        books.push(read_book("Extra A2", "A", at(2024, 2, 2, 9)));
        // A: 3 of 7 = 0.43
        let tl = timeline(&books);
        let pattern = PatternAnalyzer::new(&tl).category_pattern();
        assert_eq!(pattern.subtype, "focused");
        assert_eq!(pattern.confidence, 0.8);
    }

    #[test]
    fn test_time_based_subtypes() {
        let morning = vec![
            read_book("A", "X", at(2024, 1, 1, 7)),
            read_book("B", "X", at(2024, 1, 2, 7)),
        ];
        let tl = timeline(&morning);
        let pattern = PatternAnalyzer::new(&tl).time_based_pattern();
        assert_eq!(pattern.subtype, "morning");
        assert_eq!(pattern.confidence, 0.8);

        let night_owl = vec![read_book("A", "X", at(2024, 1, 1, 3))];
        let tl = timeline(&night_owl);
        let analyzer = PatternAnalyzer::new(&tl);
        assert_eq!(analyzer.time_based_pattern().subtype, "unknown");
        assert!(analyzer
            .classify_reading_patterns()
            .iter()
            .all(|p| p.kind != PatternKind::TimeBased));
    }

    #[test]
    fn test_volume_steady_versus_irregular() {
        let steady = monthly_reads(2023, 1, &[3, 3, 3, 3]);
        let tl = timeline(&steady);
        assert_eq!(PatternAnalyzer::new(&tl).volume_pattern().subtype, "steady");

        let irregular = monthly_reads(2023, 1, &[1, 9, 1, 9, 1]);
        let tl = timeline(&irregular);
        assert_eq!(PatternAnalyzer::new(&tl).volume_pattern().subtype, "irregular");
    }

    #[test]
    fn test_weekly_reader_is_very_consistent() {
        let books: Vec<BookRecord> = (0..8)
            .map(|i| read_book(&format!("W{i}"), "X", at(2024, 1, 1 + i * 3, 20)))
            .collect();
        let tl = timeline(&books);
        let pattern = PatternAnalyzer::new(&tl).consistency_pattern();
        assert_eq!(pattern.subtype, "very_consistent");
        assert_eq!(pattern.confidence, 0.95);
    }

    #[test]
    fn test_flat_months_have_weak_seasonality() {
        let books = monthly_reads(2023, 1, &[2; 12]);
        let tl = timeline(&books);
        let seasonality = PatternAnalyzer::new(&tl).detect_seasonality().unwrap();
        assert_eq!(seasonality.strength, SeasonalStrength::Weak);
        assert!(seasonality.peak_months.is_empty());
        assert!(seasonality.low_months.is_empty());
        assert!(seasonality.seasonality_index.iter().all(|&i| (i - 1.0).abs() < 1e-9));
    }

    #[test]
    fn test_summer_heavy_history_is_strongly_seasonal() {
        let books = monthly_reads(2023, 1, &[1, 1, 1, 1, 1, 6, 6, 6, 1, 1, 1, 1]);
        let tl = timeline(&books);
        let seasonality = PatternAnalyzer::new(&tl).detect_seasonality().unwrap();
        assert_eq!(seasonality.strength, SeasonalStrength::Strong);
        assert_eq!(seasonality.peak_months, vec![6, 7, 8]);
        assert_eq!(seasonality.low_months.len(), 9);
    }

    #[test]
    fn test_spike_month_is_flagged() {
        let mut counts = vec![1u32; 10];
        counts.push(20);
        let books = monthly_reads(2022, 1, &counts);
        let tl = timeline(&books);
        let anomalies = PatternAnalyzer::new(&tl).detect_anomalies();

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::Spike);
        assert_eq!(anomalies[0].month.to_string(), "2022-11");
        assert_eq!(anomalies[0].volume, 20);
        assert!(anomalies[0].z_score > 2.0);
    }

    #[test]
    fn test_uniform_months_have_no_anomalies() {
        let books = monthly_reads(2023, 1, &[2, 2, 2, 2]);
        let tl = timeline(&books);
        assert!(PatternAnalyzer::new(&tl).detect_anomalies().is_empty());
    }

    #[test]
    fn test_rising_counts_trend_upward() {
        let books = monthly_reads(2023, 7, &[1, 2, 3, 4, 5, 6]);
        let tl = timeline(&books);
        let trend = PatternAnalyzer::new(&tl).analyze_trends().unwrap();
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!(trend.slope > 0.1);
        assert!((trend.r_squared - 1.0).abs() < 1e-9);
        assert_eq!(trend.recent_data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_trend_uses_last_six_months_only() {
        let books = monthly_reads(2023, 1, &[9, 9, 4, 4, 4, 4, 4, 4]);
        let tl = timeline(&books);
        let trend = PatternAnalyzer::new(&tl).analyze_trends().unwrap();
        assert_eq!(trend.recent_data, vec![4; 6]);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_prediction_naive_pace() {
        // Month-of-year totals come out flat, so no seasonal adjustment applies.
        let mut books = monthly_reads(2023, 1, &[1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2]);
        books.extend(monthly_reads(2024, 1, &[1, 1, 1, 1, 1, 1]));
        let tl = timeline(&books);
        let analyzer = PatternAnalyzer::new(&tl);
        assert_eq!(analyzer.detect_seasonality().unwrap().strength, SeasonalStrength::Weak);

        let prediction = analyzer.generate_predictions().unwrap();
        assert_eq!(prediction.current_progress, 6);
        assert_eq!(prediction.monthly_pace, 1.0);
        assert_eq!(prediction.remaining_months, 6);
        assert_eq!(prediction.year_end_estimate, 12);
        assert_eq!(prediction.confidence, 0.7);
    }

    #[test]
    fn test_prediction_seasonal_adjustment() {
        // First half of the year is twice as busy as the second half.
        let mut books = monthly_reads(2023, 1, &[1; 12]);
        books.extend(monthly_reads(2024, 1, &[1, 1, 1, 1, 1, 1]));
        let tl = timeline(&books);
        let analyzer = PatternAnalyzer::new(&tl);
        assert_eq!(analyzer.detect_seasonality().unwrap().strength, SeasonalStrength::Moderate);

        // 6 so far + 1/month * 6 remaining months * 0.67 second-half index.
        let prediction = analyzer.generate_predictions().unwrap();
        assert_eq!(prediction.year_end_estimate, 10);
    }

    #[test]
    fn test_prediction_requires_twelve_reads() {
        let books = monthly_reads(2024, 1, &[2, 2, 2, 2, 2]);
        let tl = timeline(&books);
        assert!(PatternAnalyzer::new(&tl).generate_predictions().is_none());
    }
}
