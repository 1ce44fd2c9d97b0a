//! Goal-performance scoring: habit scores, rule-based advice, personal records
//! and goal progress for the `as_of` year.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;

use super::stats::{mean, round_to, std_dev};
use crate::config::GoalConfig;
use crate::models::{
    Advice, AdvicePriority, AdviceTopic, GoalProgress, GoalStatus, MonthRecord, PerformanceReport,
    PersonalBests, ScoreSet, Streak, YearRecord,
};
use crate::timeline::{days_between, ReadingTimeline, TimelineEntry};

/// Reads at most this many days apart belong to the same streak.
pub const STREAK_GAP_DAYS: i64 = 7;

pub struct PerformanceScorer<'t, 'a> {
    timeline: &'t ReadingTimeline<'a>,
    goals: GoalConfig,
    year_reads: Vec<&'t TimelineEntry<'a>>,
}

impl<'t, 'a> PerformanceScorer<'t, 'a> {
    pub fn new(timeline: &'t ReadingTimeline<'a>, goals: GoalConfig) -> Self {
        let year = timeline.current_year();
        Self {
            timeline,
            goals,
            year_reads: timeline.reads_in_year(year).collect(),
        }
    }

    pub fn evaluate(&self) -> PerformanceReport {
        let scores = self.scores();
        let total_this_year = self
            .timeline
            .entries_in_year(self.timeline.current_year())
            .count() as u32;
        let read_this_year = self.year_reads.len() as u32;

        PerformanceReport {
            advice: generate_advice(&scores),
            scores,
            personal_bests: self.personal_bests(),
            goal_progress: self.goal_progress(),
            total_books_this_year: total_this_year,
            read_books_this_year: read_this_year,
            completion_rate: if total_this_year > 0 {
                read_this_year as f64 * 100.0 / total_this_year as f64
            } else {
                0.0
            },
        }
    }

    pub fn scores(&self) -> ScoreSet {
        ScoreSet {
            consistency: self.consistency_score(),
            variety: self.variety_score(),
            progress: self.progress_rate(),
            velocity: self.reading_velocity(),
        }
    }

    /// Blend of active-month coverage and month-to-month stability, 0–100.
    pub fn consistency_score(&self) -> u32 {
        if self.year_reads.is_empty() {
            return 0;
        }

        let elapsed = self.timeline.current_month() as usize;
        let mut counts = vec![0f64; elapsed];
        for entry in &self.year_reads {
            let month = entry.at.month0() as usize;
            if month < elapsed {
                counts[month] += 1.0;
            }
        }

        let active = counts.iter().filter(|&&c| c > 0.0).count();
        let ratio = active as f64 / elapsed as f64;
        let avg = mean(&counts);
        let stability = if avg > 0.0 {
            (100.0 - std_dev(&counts) / avg * 100.0).max(0.0)
        } else {
            0.0
        };

        (0.6 * ratio * 100.0 + 0.4 * stability).round().clamp(0.0, 100.0) as u32
    }

    /// Category and author spread of this year's reads, 0–100.
    pub fn variety_score(&self) -> u32 {
        if self.year_reads.is_empty() {
            return 0;
        }

        let categories: BTreeSet<&str> = self
            .year_reads
            .iter()
            .map(|e| e.book.category_or_default())
            .collect();
        let authors: BTreeSet<&str> = self
            .year_reads
            .iter()
            .map(|e| e.book.author_or_unknown())
            .collect();

        let category_variety = (categories.len() as f64 / 5.0).min(1.0) * 50.0;
        let author_variety = (authors.len() as f64 / self.year_reads.len() as f64).min(0.8) * 50.0;
        (category_variety + author_variety).round() as u32
    }

    /// Reads this year against the pro-rated yearly target, capped at 200.
    pub fn progress_rate(&self) -> u32 {
        let day_of_year = self.timeline.as_of().ordinal() as f64;
        let expected = self.goals.yearly_target as f64 * (day_of_year / 365.0);
        if expected == 0.0 {
            return 100;
        }

        let rate = self.year_reads.len() as f64 / expected * 100.0;
        rate.min(200.0).round() as u32
    }

    /// Books per elapsed week of the year, one decimal.
    pub fn reading_velocity(&self) -> f64 {
        if self.year_reads.is_empty() {
            return 0.0;
        }

        let elapsed = self.timeline.as_of() - self.timeline.year_start();
        let weeks = (elapsed.num_seconds() as f64 / (7.0 * 86_400.0)).ceil().max(1.0);
        round_to(self.year_reads.len() as f64 / weeks, 1)
    }

    /// Lifetime records over the whole read set.
    pub fn personal_bests(&self) -> PersonalBests {
        let reads: Vec<&TimelineEntry<'a>> = self.timeline.reads().collect();
        if reads.is_empty() {
            return PersonalBests::default();
        }

        let mut yearly: BTreeMap<i32, u32> = BTreeMap::new();
        let mut monthly = BTreeMap::new();
        for entry in &reads {
            *yearly.entry(entry.at.year()).or_insert(0) += 1;
            *monthly.entry(entry.month_key()).or_insert(0u32) += 1;
        }

        // Strictly greater: the earliest period wins ties.
        let best_year = yearly
            .into_iter()
            .fold(None::<YearRecord>, |best, (year, count)| match best {
                Some(b) if b.count >= count => Some(b),
                _ => Some(YearRecord { year, count }),
            });
        let best_month = monthly
            .into_iter()
            .fold(None::<MonthRecord>, |best, (month, count)| match best {
                Some(b) if b.count >= count => Some(b),
                _ => Some(MonthRecord { month, count }),
            });

        PersonalBests {
            best_year,
            best_month,
            longest_streak: longest_streak(&reads),
            total_books_read: reads.len() as u32,
            first_read_date: reads.first().map(|e| e.at),
        }
    }

    pub fn goal_progress(&self) -> GoalProgress {
        let as_of = self.timeline.as_of();
        let current_month = self.timeline.current_month();
        let month_reads = self
            .year_reads
            .iter()
            .filter(|e| e.at.month() == current_month)
            .count() as u32;

        let year_progress = as_of.ordinal() as f64 / self.timeline.days_in_year() as f64 * 100.0;
        let month_progress = as_of.day() as f64 / self.timeline.days_in_month() as f64 * 100.0;

        GoalProgress {
            yearly: goal_status(self.goals.yearly_target, self.year_reads.len() as u32, year_progress),
            monthly: goal_status(self.goals.effective_monthly_target(), month_reads, month_progress),
        }
    }
}

fn goal_status(target: u32, current: u32, time_progress: f64) -> GoalStatus {
    GoalStatus {
        target,
        current,
        percentage: if target > 0 {
            current as f64 * 100.0 / target as f64
        } else {
            100.0
        },
        on_track: current as f64 >= target as f64 * time_progress / 100.0,
        remaining: target.saturating_sub(current),
        time_progress,
    }
}

/// Longest run of reads whose consecutive gaps are at most [`STREAK_GAP_DAYS`].
fn longest_streak(reads: &[&TimelineEntry<'_>]) -> Streak {
    let Some(first) = reads.first() else {
        return Streak::default();
    };

    let mut longest = Streak::default();
    let mut current = Streak {
        days: 1,
        start: Some(first.at),
        end: Some(first.at),
    };

    for pair in reads.windows(2) {
        let (prev, cur) = (pair[0].at, pair[1].at);
        if days_between(&prev, &cur) <= STREAK_GAP_DAYS {
            let start = current.start.unwrap_or(prev);
            current.end = Some(cur);
            current.days = days_between(&start, &cur) + 1;
        } else {
            if current.days > longest.days {
                longest = current.clone();
            }
            current = Streak {
                days: 1,
                start: Some(cur),
                end: Some(cur),
            };
        }
    }

    if current.days > longest.days {
        longest = current;
    }
    longest
}

/// Independent rules over the score set; a single positive entry when none fire.
pub fn generate_advice(scores: &ScoreSet) -> Vec<Advice> {
    let mut advice = Vec::new();

    if scores.consistency < 50 {
        advice.push(Advice {
            topic: AdviceTopic::Consistency,
            title: "Build a steadier reading habit".to_string(),
            description: "Read a little every day to make the habit stick".to_string(),
            priority: AdvicePriority::High,
            action_items: actions(&[
                "Set aside 15 minutes of reading every day",
                "Schedule a reading reminder",
                "Start with a small goal, such as one book a week",
            ]),
        });
    }

    if scores.variety < 40 {
        advice.push(Advice {
            topic: AdviceTopic::Variety,
            title: "Broaden your reading".to_string(),
            description: "Books from other categories widen your perspective".to_string(),
            priority: AdvicePriority::Medium,
            action_items: actions(&[
                "Try one book from a new genre each month",
                "Pick books by authors you have not read yet",
                "Use the recommendations",
            ]),
        });
    }

    if scores.progress < 80 {
        advice.push(Advice {
            topic: AdviceTopic::Progress,
            title: "Pick up the pace".to_string(),
            description: "Speed up to reach this year's target".to_string(),
            priority: if scores.progress < 50 {
                AdvicePriority::High
            } else {
                AdvicePriority::Medium
            },
            action_items: actions(&[
                "Increase your reading time",
                "Adjust the yearly target",
                "Try audiobooks",
            ]),
        });
    }

    if scores.velocity < 0.5 {
        advice.push(Advice {
            topic: AdviceTopic::Velocity,
            title: "Read more efficiently".to_string(),
            description: "A few techniques help you get through books faster".to_string(),
            priority: AdvicePriority::Medium,
            action_items: actions(&[
                "Learn to skim",
                "Read with a clear purpose",
                "Write short summaries as you go",
            ]),
        });
    }

    if advice.is_empty() {
        advice.push(Advice {
            topic: AdviceTopic::Excellence,
            title: "Excellent reading habit!".to_string(),
            description: "Keep it up".to_string(),
            priority: AdvicePriority::Info,
            action_items: actions(&[
                "Keep logging your reading",
                "Set yourself a new challenge",
                "Share your reading habit with others",
            ]),
        });
    }

    advice
}

fn actions(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookRecord;
    use crate::timeline::fixtures::*;
    use crate::timeline::MonthKey;
    use chrono::{Offset, Utc};
    use proptest::prelude::*;

    fn timeline_at(books: &[BookRecord], month: u32, day: u32) -> ReadingTimeline<'_> {
        ReadingTimeline::new(books, at(2024, month, day, 12), Utc.fix())
    }

    #[test]
    fn test_empty_list_scores_zero_but_keeps_defined_values() {
        let tl = timeline_at(&[], 6, 1);
        let report = PerformanceScorer::new(&tl, GoalConfig::default()).evaluate();
        assert_eq!(report.scores.consistency, 0);
        assert_eq!(report.scores.variety, 0);
        assert_eq!(report.scores.progress, 0);
        assert_eq!(report.scores.velocity, 0.0);
        assert_eq!(report.completion_rate, 0.0);
        assert_eq!(report.personal_bests, PersonalBests::default());
        assert!(!report.advice.is_empty());
    }

    #[test]
    fn test_consistency_even_months_scores_full() {
        // Two reads in each of Jan..Apr, evaluated in April.
        let books = monthly_reads(2024, 1, &[2, 2, 2, 2]);
        let tl = timeline_at(&books, 4, 28);
        assert_eq!(PerformanceScorer::new(&tl, GoalConfig::default()).consistency_score(), 100);
    }

    #[test]
    fn test_consistency_mixed_scale_formula() {
        // Jan: 4 reads, Feb: 0 → ratio 0.5, mean 2, sd 2 → stability 0.
        let books = monthly_reads(2024, 1, &[4]);
        let tl = timeline_at(&books, 2, 20);
        assert_eq!(PerformanceScorer::new(&tl, GoalConfig::default()).consistency_score(), 30);
    }

    #[test]
    fn test_variety_score() {
        let books: Vec<BookRecord> = ["A", "B", "C", "D", "E"]
            .iter()
            .enumerate()
            .map(|(i, c)| read_book(&format!("T{i}"), c, at(2024, 1, 2 + i as u32, 9)))
            .collect();
        let tl = timeline_at(&books, 3, 1);
        // 5 categories → 50; 5 authors / 5 reads capped at 0.8 → 40.
        assert_eq!(PerformanceScorer::new(&tl, GoalConfig::default()).variety_score(), 90);
    }

    #[test]
    fn test_progress_rate_guards_zero_target_and_caps() {
        let books = monthly_reads(2024, 1, &[10]);
        let tl = timeline_at(&books, 1, 31);

        let zero_goal = PerformanceScorer::new(&tl, GoalConfig::new(0));
        assert_eq!(zero_goal.progress_rate(), 100);

        let small_goal = PerformanceScorer::new(&tl, GoalConfig::new(12));
        assert_eq!(small_goal.progress_rate(), 200);
    }

    #[test]
    fn test_progress_rate_on_schedule() {
        // Day 73 of 2024 (March 13): 50 * 73 / 365 = 10 expected.
        let books = monthly_reads(2024, 1, &[5, 5]);
        let tl = timeline_at(&books, 3, 13);
        assert_eq!(PerformanceScorer::new(&tl, GoalConfig::new(50)).progress_rate(), 100);
    }

    #[test]
    fn test_reading_velocity() {
        // Jan 1 00:00 → Jan 29 00:00 is exactly 4 weeks.
        let books = monthly_reads(2024, 1, &[6]);
        let tl = ReadingTimeline::new(&books, at(2024, 1, 29, 0), Utc.fix());
        assert_eq!(PerformanceScorer::new(&tl, GoalConfig::default()).reading_velocity(), 1.5);
    }

    #[test]
    fn test_advice_rules() {
        let weak = ScoreSet {
            consistency: 10,
            variety: 10,
            progress: 40,
            velocity: 0.1,
        };
        let advice = generate_advice(&weak);
        assert_eq!(advice.len(), 4);
        assert_eq!(advice[0].priority, AdvicePriority::High);
        assert_eq!(advice[2].topic, AdviceTopic::Progress);
        assert_eq!(advice[2].priority, AdvicePriority::High);
        assert!(advice.iter().all(|a| a.action_items.len() == 3));

        let middling_progress = ScoreSet {
            consistency: 90,
            variety: 90,
            progress: 60,
            velocity: 1.0,
        };
        let advice = generate_advice(&middling_progress);
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].priority, AdvicePriority::Medium);

        let strong = ScoreSet {
            consistency: 90,
            variety: 90,
            progress: 120,
            velocity: 1.0,
        };
        let advice = generate_advice(&strong);
        assert_eq!(advice.len(), 1);
        assert_eq!(advice[0].topic, AdviceTopic::Excellence);
        assert_eq!(advice[0].priority, AdvicePriority::Info);
    }

    #[test]
    fn test_personal_bests() {
        let mut books = monthly_reads(2022, 3, &[1, 4, 1]);
        books.extend(monthly_reads(2023, 1, &[2, 2, 3]));
        let tl = timeline_at(&books, 6, 1);
        let bests = PerformanceScorer::new(&tl, GoalConfig::default()).personal_bests();

        assert_eq!(bests.total_books_read, 13);
        assert_eq!(bests.best_year, Some(YearRecord { year: 2023, count: 7 }));
        assert_eq!(
            bests.best_month,
            Some(MonthRecord {
                month: MonthKey::new(2022, 4),
                count: 4
            })
        );
        assert_eq!(bests.first_read_date.unwrap().to_string(), "2022-03-01 20:00:00");
    }

    #[test]
    fn test_longest_streak_breaks_on_long_gaps() {
        let books = vec![
            read_book("a", "X", at(2024, 1, 1, 9)),
            read_book("b", "X", at(2024, 1, 6, 9)),
            read_book("c", "X", at(2024, 1, 12, 9)),
            read_book("d", "X", at(2024, 3, 1, 9)),
            read_book("e", "X", at(2024, 3, 3, 9)),
        ];
        let tl = timeline_at(&books, 6, 1);
        let streak = PerformanceScorer::new(&tl, GoalConfig::default())
            .personal_bests()
            .longest_streak;

        assert_eq!(streak.days, 12);
        assert_eq!(streak.start.unwrap().to_string(), "2024-01-01 09:00:00");
        assert_eq!(streak.end.unwrap().to_string(), "2024-01-12 09:00:00");
    }

    #[test]
    fn test_goal_progress() {
        // June 15 2024: month half gone; 3 reads in June against a monthly target of 5.
        let mut books = monthly_reads(2024, 1, &[4, 4, 4, 4, 4]);
        books.extend(monthly_reads(2024, 6, &[3]));
        let tl = timeline_at(&books, 6, 15);
        let progress = PerformanceScorer::new(&tl, GoalConfig::new(50)).goal_progress();

        assert_eq!(progress.yearly.current, 23);
        assert_eq!(progress.yearly.remaining, 27);
        assert_eq!(progress.yearly.percentage, 46.0);
        // Day 167 of 366 → 45.6% of 50 = 22.8 expected.
        assert!(progress.yearly.on_track);

        assert_eq!(progress.monthly.target, 5);
        assert_eq!(progress.monthly.current, 3);
        assert_eq!(progress.monthly.time_progress, 50.0);
        assert!(progress.monthly.on_track);
    }

    #[test]
    fn test_completion_rate_counts_unread_additions() {
        let mut books = monthly_reads(2024, 1, &[3]);
        books.push(BookRecord::new("Shelved").with_created_at(at(2024, 2, 1, 9)));
        let tl = timeline_at(&books, 3, 1);
        let report = PerformanceScorer::new(&tl, GoalConfig::default()).evaluate();
        assert_eq!(report.total_books_this_year, 4);
        assert_eq!(report.read_books_this_year, 3);
        assert_eq!(report.completion_rate, 75.0);
    }

    proptest! {
        #[test]
        fn prop_scores_stay_in_bounds(
            counts in proptest::collection::vec(0u32..15, 1..12),
            target in 0u32..200,
            month in 1u32..=12,
        ) {
            let books = monthly_reads(2024, 1, &counts);
            let tl = ReadingTimeline::new(&books, at(2024, month, 28, 23), Utc.fix());
            let scores = PerformanceScorer::new(&tl, GoalConfig::new(target)).scores();
            prop_assert!(scores.consistency <= 100);
            prop_assert!(scores.variety <= 100);
            prop_assert!(scores.progress <= 200);
            prop_assert!(scores.velocity.is_finite());
        }
    }
}
