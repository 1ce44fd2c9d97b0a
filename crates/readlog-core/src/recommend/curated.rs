use crate::models::{CandidateBook, RecommendationItem};

/// Fixed popular picks served to users with an empty library.
const POPULAR: [(&str, &str, &str, f64, &str); 5] = [
    (
        "Artificial Intelligence: Will It Surpass Humans?",
        "Yutaka Matsuo",
        "Data Analysis",
        0.9,
        "Popular introduction to AI",
    ),
    (
        "Issue Driven",
        "Kazuto Ataka",
        "Business",
        0.8,
        "Classic on problem framing",
    ),
    (
        "Clean Code",
        "Robert C. Martin",
        "Infrastructure",
        0.8,
        "Essential reading for engineers",
    ),
    (
        "Competitive Strategy as a Story",
        "Ken Kusunoki",
        "Consulting",
        0.7,
        "Well-loved strategy primer",
    ),
    (
        "Factfulness",
        "Hans Rosling",
        "Other",
        0.7,
        "Data-driven view of the world",
    ),
];

pub fn popular_recommendations() -> Vec<RecommendationItem> {
    POPULAR
        .iter()
        .map(|&(title, author, category, score, reason)| RecommendationItem {
            book: CandidateBook::new(title, author, category),
            score,
            reasons: vec![reason.to_string()],
            user_feedback: None,
            in_wishlist: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popular_list_is_fixed() {
        let items = popular_recommendations();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0].book.title, "Artificial Intelligence: Will It Surpass Humans?");
        assert_eq!(items[0].score, 0.9);
        assert!(items.iter().all(|i| i.reasons.len() == 1));
        assert!(items.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
