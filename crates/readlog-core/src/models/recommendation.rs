use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::book::DEFAULT_CATEGORY;

/// A book from the candidate catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBook {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl CandidateBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    #[serde(flatten)]
    pub book: CandidateBook,
    /// Weighted affinity in `[0, 1]`.
    pub score: f64,
    /// At most two human-readable reasons.
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<Sentiment>,
    #[serde(default)]
    pub in_wishlist: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
        }
    }
}

impl std::str::FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            _ => Err(format!("Invalid Sentiment: {s}")),
        }
    }
}

// ─── Weights ────────────────────────────────────────────────

/// Four-factor scoring weights, non-negative and summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightVector {
    pub category: f64,
    pub author: f64,
    pub history: f64,
    pub recency: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            category: 0.4,
            author: 0.3,
            history: 0.2,
            recency: 0.1,
        }
    }
}

pub const POSITIVE_FEEDBACK_FACTOR: f64 = 1.05;
pub const NEGATIVE_FEEDBACK_FACTOR: f64 = 0.95;

impl WeightVector {
    pub fn sum(&self) -> f64 {
        self.category + self.author + self.history + self.recency
    }

    /// Rescale to sum to 1; an all-zero vector falls back to the defaults.
    pub fn normalized(self) -> Self {
        let total = self.sum();
        if !(total.is_finite() && total > 0.0) {
            return Self::default();
        }
        Self {
            category: self.category / total,
            author: self.author / total,
            history: self.history / total,
            recency: self.recency / total,
        }
    }

    /// Weights after one round of feedback.
    ///
    /// The profile-affinity factors (category and author) are scaled by
    /// 1.05 for positive and 0.95 for negative feedback before renormalizing,
    /// so a positive signal shifts weight toward the user's established
    /// tastes and a negative one toward history and recency.
    pub fn adjusted(self, sentiment: Sentiment) -> Self {
        let factor = match sentiment {
            Sentiment::Positive => POSITIVE_FEEDBACK_FACTOR,
            Sentiment::Negative => NEGATIVE_FEEDBACK_FACTOR,
        };
        Self {
            category: self.category * factor,
            author: self.author * factor,
            ..self
        }
        .normalized()
    }

    pub fn is_valid(&self) -> bool {
        [self.category, self.author, self.history, self.recency]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
            && (self.sum() - 1.0).abs() < 1e-9
    }
}

// ─── Behavior history ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub author: String,
    pub count: u32,
}

/// The parts of a user profile worth keeping with a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub top_categories: Vec<CategoryCount>,
    pub top_authors: Vec<AuthorCount>,
    pub total_books: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub title: String,
    pub author: String,
    pub category: String,
    pub score: f64,
}

/// One recommendation run, as persisted in the behavior store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSnapshot {
    pub id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub profile: ProfileSummary,
    pub recommendations: Vec<SnapshotEntry>,
}

impl BehaviorSnapshot {
    pub fn new(user_id: impl Into<String>, profile: ProfileSummary, items: &[RecommendationItem]) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.into(),
            timestamp: Utc::now(),
            profile,
            recommendations: items
                .iter()
                .map(|item| SnapshotEntry {
                    title: item.book.title.clone(),
                    author: item.book.author.clone(),
                    category: item.book.category.clone(),
                    score: item.score,
                })
                .collect(),
        }
    }
}

/// Explicit feedback on one recommended title. The latest entry per title wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub user_id: String,
    pub title: String,
    pub sentiment: Sentiment,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, sentiment: Sentiment) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            sentiment,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = WeightVector::default();
        assert!(w.is_valid());
        assert_eq!(w.category, 0.4);
    }

    #[test]
    fn test_positive_feedback_raises_category_weight() {
        let before = WeightVector::default();
        let after = before.adjusted(Sentiment::Positive);
        assert!(after.category > before.category);
        assert!(after.author > before.author);
        assert!(after.history < before.history);
        assert!((after.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_feedback_lowers_category_weight() {
        let before = WeightVector::default();
        let after = before.adjusted(Sentiment::Negative);
        assert!(after.category < before.category);
        assert!(after.recency > before.recency);
        assert!(after.is_valid());
    }

    #[test]
    fn test_normalize_zero_vector_falls_back() {
        let zero = WeightVector {
            category: 0.0,
            author: 0.0,
            history: 0.0,
            recency: 0.0,
        };
        assert_eq!(zero.normalized(), WeightVector::default());
    }

    #[test]
    fn test_sentiment_parse() {
        assert_eq!("positive".parse::<Sentiment>().unwrap(), Sentiment::Positive);
        assert_eq!(Sentiment::Negative.to_string(), "negative");
        assert!("meh".parse::<Sentiment>().is_err());
    }

    #[test]
    fn test_recommendation_item_serializes_flat() {
        let item = RecommendationItem {
            book: CandidateBook::new("Dune", "Frank Herbert", "SF"),
            score: 0.5,
            reasons: vec!["reason".to_string()],
            user_feedback: None,
            in_wishlist: false,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["title"], "Dune");
        assert_eq!(json["inWishlist"], false);
        assert!(json.get("userFeedback").is_none());
    }
}
