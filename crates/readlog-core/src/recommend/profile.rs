use std::collections::{BTreeMap, BTreeSet};

use crate::models::{AuthorCount, BookRecord, CategoryCount, ProfileSummary, DEFAULT_CATEGORY};
use crate::timeline::{MonthKey, ReadingTimeline};

pub const RECENT_BOOKS: usize = 10;
const SUMMARY_TOP: usize = 3;

/// Per-call taste profile. Rebuilt from the book list on every request.
#[derive(Debug, Clone, Default)]
pub struct UserProfile<'a> {
    pub categories: BTreeMap<String, u32>,
    pub authors: BTreeMap<String, u32>,
    pub monthly_activity: BTreeMap<MonthKey, u32>,
    /// Most recent dated books, newest first.
    pub recent_books: Vec<&'a BookRecord>,
}

impl<'a> UserProfile<'a> {
    pub fn build(timeline: &ReadingTimeline<'a>) -> Self {
        let mut profile = Self::default();

        for book in timeline.books() {
            *profile
                .categories
                .entry(book.category_or_default().to_string())
                .or_insert(0) += 1;
            if !book.author.trim().is_empty() {
                *profile.authors.entry(book.author.clone()).or_insert(0) += 1;
            }
        }

        for entry in timeline.entries() {
            *profile.monthly_activity.entry(entry.month_key()).or_insert(0) += 1;
        }

        profile.recent_books = timeline
            .entries()
            .iter()
            .rev()
            .take(RECENT_BOOKS)
            .map(|e| e.book)
            .collect();

        profile
    }

    pub fn category_count(&self, category: &str) -> Option<u32> {
        self.categories.get(category).copied()
    }

    pub fn author_count(&self, author: &str) -> Option<u32> {
        if author.trim().is_empty() {
            return None;
        }
        self.authors.get(author).copied()
    }

    pub fn category_total(&self) -> u32 {
        self.categories.values().sum()
    }

    pub fn author_total(&self) -> u32 {
        self.authors.values().sum()
    }

    /// Most-read category; ties go to the alphabetically first.
    pub fn top_category(&self) -> Option<(&str, u32)> {
        ranked(&self.categories).into_iter().next()
    }

    /// Reads logged this month and last month.
    pub fn recent_activity(&self, current: MonthKey) -> u32 {
        let this_month = self.monthly_activity.get(&current).copied().unwrap_or(0);
        let last_month = self
            .monthly_activity
            .get(&current.previous())
            .copied()
            .unwrap_or(0);
        this_month + last_month
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            top_categories: ranked(&self.categories)
                .into_iter()
                .take(SUMMARY_TOP)
                .map(|(category, count)| CategoryCount {
                    category: category.to_string(),
                    count,
                })
                .collect(),
            top_authors: ranked(&self.authors)
                .into_iter()
                .take(SUMMARY_TOP)
                .map(|(author, count)| AuthorCount {
                    author: author.to_string(),
                    count,
                })
                .collect(),
            total_books: self.category_total(),
        }
    }
}

fn ranked(counts: &BTreeMap<String, u32>) -> Vec<(&str, u32)> {
    let mut entries: Vec<(&str, u32)> = counts.iter().map(|(k, &v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
}

/// Lowercased words longer than two characters from title, author and category.
pub fn keywords(title: &str, author: &str, category: &str) -> BTreeSet<String> {
    let category = if category.trim().is_empty() {
        DEFAULT_CATEGORY
    } else {
        category
    };

    title
        .split_whitespace()
        .chain(author.split_whitespace())
        .chain(category.split_whitespace())
        .map(str::to_lowercase)
        .filter(|word| word.chars().count() > 2)
        .collect()
}

/// Shared keywords over the size of the larger set.
pub fn keyword_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let larger = a.len().max(b.len());
    if larger == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / larger as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::fixtures::*;
    use chrono::{Offset, Utc};

    #[test]
    fn test_build_profile_counts_everything() {
        let books = vec![
            read_book("Cosmos", "Science", at(2024, 5, 1, 9)),
            read_book("Brief History", "Science", at(2024, 6, 1, 9)),
            BookRecord::new("Wishlist Novel").with_category("Fiction"),
        ];
        let tl = ReadingTimeline::new(&books, at(2024, 6, 15, 0), Utc.fix());
        let profile = UserProfile::build(&tl);

        assert_eq!(profile.category_count("Science"), Some(2));
        assert_eq!(profile.category_count("Fiction"), Some(1));
        assert_eq!(profile.category_total(), 3);
        // The undated wishlist book has no author.
        assert_eq!(profile.author_total(), 2);
        assert_eq!(profile.recent_books[0].title, "Brief History");
        assert_eq!(profile.recent_activity(MonthKey::new(2024, 6)), 2);
        assert_eq!(profile.top_category(), Some(("Science", 2)));
    }

    #[test]
    fn test_recent_books_capped_at_ten() {
        let books = monthly_reads(2023, 1, &[3, 3, 3, 3, 3]);
        let tl = ReadingTimeline::new(&books, at(2024, 1, 1, 0), Utc.fix());
        let profile = UserProfile::build(&tl);
        assert_eq!(profile.recent_books.len(), RECENT_BOOKS);
        assert!(profile.recent_books[0].created_at >= profile.recent_books[9].created_at);
    }

    #[test]
    fn test_summary_keeps_top_three() {
        let books: Vec<BookRecord> = ["A", "A", "A", "B", "B", "C", "D"]
            .iter()
            .map(|c| BookRecord::new("t").with_category(*c))
            .collect();
        let tl = ReadingTimeline::new(&books, at(2024, 1, 1, 0), Utc.fix());
        let summary = UserProfile::build(&tl).summary();
        assert_eq!(summary.total_books, 7);
        assert_eq!(summary.top_categories.len(), 3);
        assert_eq!(summary.top_categories[0].category, "A");
        assert_eq!(summary.top_categories[1].category, "B");
    }

    #[test]
    fn test_keywords_and_overlap() {
        let a = keywords("The Rust Programming Language", "Steve Klabnik", "Programming");
        assert!(a.contains("rust"));
        assert!(a.contains("programming"));
        assert!(!a.contains("of"));

        let b = keywords("Programming Rust", "Jim Blandy", "Programming");
        let overlap = keyword_overlap(&a, &b);
        // {rust, programming} shared; a has {the, rust, programming, language, steve, klabnik}.
        assert!((overlap - 2.0 / 6.0).abs() < 1e-9);

        assert_eq!(keyword_overlap(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }
}
