use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "Other";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A single entry in a user's reading log, as supplied by the book store.
///
/// Records without `created_at` are kept for the non-temporal counts but are
/// ignored by every time-series computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    #[serde(default)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub author: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_place: Option<String>,

    #[serde(default)]
    pub is_read: bool,

    #[serde(default)]
    pub is_owned: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl BookRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            author: String::new(),
            category: default_category(),
            storage_place: None,
            is_read: false,
            is_owned: false,
            rating: None,
            memo: None,
            created_at: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into();
        self.category = if category.trim().is_empty() {
            default_category()
        } else {
            category
        };
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn read(mut self) -> Self {
        self.is_read = true;
        self
    }

    pub fn owned(mut self) -> Self {
        self.is_owned = true;
        self
    }

    /// Ratings are clamped into the 0–5 star range.
    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating.min(5));
        self
    }

    /// Category with the empty string folded into the default bucket.
    pub fn category_or_default(&self) -> &str {
        if self.category.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            &self.category
        }
    }

    pub fn author_or_unknown(&self) -> &str {
        if self.author.trim().is_empty() {
            "Unknown"
        } else {
            &self.author
        }
    }

    pub fn title_key(&self) -> String {
        self.title.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_book_record_new() {
        let book = BookRecord::new("The Rust Programming Language");
        assert_eq!(book.title, "The Rust Programming Language");
        assert_eq!(book.category, "Other");
        assert!(!book.is_read);
        assert!(book.created_at.is_none());
    }

    #[test]
    fn test_missing_category_defaults_to_other() {
        let json = r#"{"title": "Dune", "author": "Frank Herbert", "isRead": true}"#;
        let book: BookRecord = serde_json::from_str(json).unwrap();
        assert_eq!(book.category, "Other");
        assert!(book.is_read);
        assert!(!book.is_owned);
    }

    #[test]
    fn test_empty_category_and_author_fallbacks() {
        let book = BookRecord::new("Untitled").with_category("  ");
        assert_eq!(book.category_or_default(), "Other");
        assert_eq!(book.author_or_unknown(), "Unknown");
    }

    #[test]
    fn test_rating_is_clamped() {
        let book = BookRecord::new("Overrated").with_rating(9);
        assert_eq!(book.rating, Some(5));
    }

    #[test]
    fn test_book_record_json_roundtrip() {
        let created = Utc.with_ymd_and_hms(2024, 3, 5, 21, 0, 0).unwrap();
        let book = BookRecord::new("Test Book")
            .with_author("Author One")
            .with_category("Science")
            .with_created_at(created)
            .read()
            .owned();

        let json = serde_json::to_string_pretty(&book).unwrap();
        assert!(json.contains("createdAt"));
        let restored: BookRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, book);
    }
}
