pub mod patterns;
pub mod performance;
pub mod statistics;
pub(crate) mod stats;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub use patterns::PatternAnalyzer;
pub use performance::{generate_advice, PerformanceScorer};
pub use statistics::ReadingStatistics;

use crate::config::AppConfig;
use crate::models::{BookRecord, LibrarySummary, PatternReport, PerformanceReport};
use crate::timeline::ReadingTimeline;

/// Pattern, performance and summary bundles for one book list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Local reference time the report was computed for.
    pub as_of: NaiveDateTime,
    pub patterns: PatternReport,
    pub performance: PerformanceReport,
    pub summary: LibrarySummary,
}

/// Run every analyzer over `books` as of `as_of`.
///
/// The pattern analyzer runs on a scoped thread alongside the scorer; both
/// borrow the same timeline.
pub fn analyze(books: &[BookRecord], config: &AppConfig, as_of: DateTime<Utc>) -> AnalyticsReport {
    let timeline = ReadingTimeline::with_config(books, as_of, &config.timeline);

    let (patterns, performance) = std::thread::scope(|scope| {
        let patterns = scope.spawn(|| PatternAnalyzer::new(&timeline).analyze());
        let performance = PerformanceScorer::new(&timeline, config.goals.clone()).evaluate();
        let patterns = patterns
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        (patterns, performance)
    });

    tracing::debug!(
        books = books.len(),
        reads = timeline.read_count(),
        patterns = patterns.patterns.len(),
        "analytics computed"
    );

    AnalyticsReport {
        as_of: timeline.as_of(),
        patterns,
        performance,
        summary: ReadingStatistics::new(&timeline).summary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::fixtures::*;

    #[test]
    fn test_analyze_matches_individual_analyzers() {
        let mut books = monthly_reads(2023, 1, &[2, 1, 3, 2, 2, 1, 3, 2, 1, 2, 2, 3]);
        books.extend(monthly_reads(2024, 1, &[2, 3, 1]));
        let config = AppConfig::default();
        let as_of = at(2024, 3, 20, 12);

        let report = analyze(&books, &config, as_of);

        let timeline = ReadingTimeline::with_config(&books, as_of, &config.timeline);
        assert_eq!(report.patterns, PatternAnalyzer::new(&timeline).analyze());
        assert_eq!(
            report.performance,
            PerformanceScorer::new(&timeline, config.goals.clone()).evaluate()
        );
        assert_eq!(report.summary.read_books, 30);
        assert_eq!(report.performance.read_books_this_year, 6);
    }

    #[test]
    fn test_analyze_empty_library() {
        let report = analyze(&[], &AppConfig::default(), at(2024, 6, 1, 0));
        assert!(report.patterns.patterns.is_empty());
        assert!(report.patterns.trend.is_none());
        assert_eq!(report.performance.scores.consistency, 0);
        assert_eq!(report.summary.total_books, 0);
    }
}
