use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, Offset, Utc};

use super::curated::popular_recommendations;
use super::profile::{keyword_overlap, keywords, UserProfile};
use crate::config::{RecommendationConfig, TimelineConfig};
use crate::models::{
    BehaviorSnapshot, BookRecord, CandidateBook, FeedbackRecord, RecommendationItem, Sentiment,
    WeightVector, DEFAULT_CATEGORY,
};
use crate::storage::BehaviorStore;
use crate::timeline::{offset_from_minutes, ReadingTimeline};

const MAX_REASONS: usize = 2;
const MAX_RECENT_BONUS: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct RecommendOptions {
    pub max_recommendations: usize,
    pub exclude_read: bool,
    /// Snapshots and feedback lookups are skipped without a user.
    pub user_id: Option<String>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            max_recommendations: 5,
            exclude_read: true,
            user_id: None,
        }
    }
}

impl From<&RecommendationConfig> for RecommendOptions {
    fn from(config: &RecommendationConfig) -> Self {
        Self {
            max_recommendations: config.max_recommendations,
            exclude_read: config.exclude_read,
            user_id: None,
        }
    }
}

impl RecommendOptions {
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Content-based recommender with feedback-adapted weights.
///
/// The weight vector is shared by every caller of one engine. Hosts that want
/// per-user adaptation keep their own [`WeightVector`], evolve it with
/// [`WeightVector::adjusted`] and score through
/// [`RecommendationEngine::recommend_with_weights`].
pub struct RecommendationEngine<S: BehaviorStore> {
    weights: RwLock<WeightVector>,
    store: S,
    offset: FixedOffset,
}

impl<S: BehaviorStore> RecommendationEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            weights: RwLock::new(WeightVector::default()),
            store,
            offset: Utc.fix(),
        }
    }

    /// Engine starting from the weights last persisted in `store`, if any.
    pub fn with_store(store: S) -> Self {
        let weights = match store.load_weights() {
            Ok(Some(w)) if w.is_valid() => w,
            Ok(Some(w)) => {
                tracing::warn!(?w, "ignoring invalid persisted weights");
                WeightVector::default()
            }
            Ok(None) => WeightVector::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load engine weights");
                WeightVector::default()
            }
        };
        Self {
            weights: RwLock::new(weights),
            store,
            offset: Utc.fix(),
        }
    }

    pub fn with_timeline(mut self, config: &TimelineConfig) -> Self {
        self.offset = offset_from_minutes(config.utc_offset_minutes);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn weights(&self) -> WeightVector {
        *self.weights.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn generate_recommendations(
        &self,
        user_books: &[BookRecord],
        candidates: &[CandidateBook],
        options: &RecommendOptions,
    ) -> Vec<RecommendationItem> {
        self.generate_recommendations_at(user_books, candidates, options, Utc::now())
    }

    pub fn generate_recommendations_at(
        &self,
        user_books: &[BookRecord],
        candidates: &[CandidateBook],
        options: &RecommendOptions,
        as_of: DateTime<Utc>,
    ) -> Vec<RecommendationItem> {
        let weights = self.weights();
        self.recommend_with_weights(&weights, user_books, candidates, options, as_of)
    }

    /// Score `candidates` with explicit weights instead of the engine's own.
    pub fn recommend_with_weights(
        &self,
        weights: &WeightVector,
        user_books: &[BookRecord],
        candidates: &[CandidateBook],
        options: &RecommendOptions,
        as_of: DateTime<Utc>,
    ) -> Vec<RecommendationItem> {
        if user_books.is_empty() {
            tracing::debug!("empty library, serving popular picks");
            let mut items = popular_recommendations();
            items.truncate(options.max_recommendations);
            return items;
        }

        let timeline = ReadingTimeline::new(user_books, as_of, self.offset);
        let profile = UserProfile::build(&timeline);
        let mut items = score_candidates(weights, &profile, &timeline, candidates, options);

        if let Some(user_id) = options.user_id.as_deref() {
            self.attach_feedback(user_id, &mut items);
            let snapshot = BehaviorSnapshot::new(user_id, profile.summary(), &items);
            if let Err(e) = self.store.append(user_id, &snapshot) {
                tracing::warn!(user_id, error = %e, "failed to persist behavior snapshot");
            }
        }

        tracing::debug!(
            candidates = candidates.len(),
            returned = items.len(),
            "generated recommendations"
        );
        items
    }

    fn attach_feedback(&self, user_id: &str, items: &mut [RecommendationItem]) {
        let feedback = match self.store.feedback(user_id) {
            Ok(feedback) => feedback,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "failed to read feedback");
                return;
            }
        };
        let by_title: HashMap<&str, Sentiment> = feedback
            .iter()
            .map(|f| (f.title.as_str(), f.sentiment))
            .collect();
        for item in items.iter_mut() {
            item.user_feedback = by_title.get(item.book.title.as_str()).copied();
        }
    }

    /// Record feedback and shift the engine-wide weights. Returns the new weights.
    pub fn provide_feedback(&self, user_id: &str, title: &str, sentiment: Sentiment) -> WeightVector {
        let record = FeedbackRecord::new(user_id, title, sentiment);
        if let Err(e) = self.store.record_feedback(&record) {
            tracing::warn!(user_id, title, error = %e, "failed to record feedback");
        }

        let updated = {
            let mut weights = self.weights.write().unwrap_or_else(PoisonError::into_inner);
            *weights = weights.adjusted(sentiment);
            *weights
        };

        if let Err(e) = self.store.save_weights(&updated) {
            tracing::warn!(error = %e, "failed to persist engine weights");
        }
        tracing::debug!(user_id, %sentiment, ?updated, "weights adjusted");
        updated
    }

    /// Stored snapshots for `user_id`, oldest first. Empty when the store fails.
    pub fn behavior_history(&self, user_id: &str) -> Vec<BehaviorSnapshot> {
        self.store.read(user_id).unwrap_or_else(|e| {
            tracing::warn!(user_id, error = %e, "failed to read behavior history");
            Vec::new()
        })
    }

    /// Flag items whose title is on the wishlist (case-insensitive).
    pub fn mark_wishlist<'w>(
        &self,
        items: &mut [RecommendationItem],
        wishlist: impl IntoIterator<Item = &'w str>,
    ) {
        let wanted: HashSet<String> = wishlist.into_iter().map(str::to_lowercase).collect();
        for item in items.iter_mut() {
            item.in_wishlist = wanted.contains(&item.book.title.to_lowercase());
        }
    }
}

fn score_candidates(
    weights: &WeightVector,
    profile: &UserProfile<'_>,
    timeline: &ReadingTimeline<'_>,
    candidates: &[CandidateBook],
    options: &RecommendOptions,
) -> Vec<RecommendationItem> {
    let books = timeline.books();
    let known: HashSet<String> = books.iter().map(BookRecord::title_key).collect();
    let read: HashSet<String> = books
        .iter()
        .filter(|b| b.is_read)
        .map(BookRecord::title_key)
        .collect();

    let recent: Vec<BTreeSet<String>> = profile
        .recent_books
        .iter()
        .map(|b| keywords(&b.title, &b.author, b.category_or_default()))
        .collect();
    let recent_bonus =
        (profile.recent_activity(timeline.current_month_key()) as f64 / 10.0).min(MAX_RECENT_BONUS);
    let category_total = profile.category_total() as f64;
    let author_total = profile.author_total() as f64;

    let mut scored: Vec<RecommendationItem> = candidates
        .iter()
        .filter(|c| !known.contains(&c.title.to_lowercase()))
        .filter_map(|candidate| {
            let category = category_of(candidate);
            let mut score = 0.0;

            if let Some(count) = profile.category_count(category) {
                score += weights.category * count as f64 / category_total;
            }
            if let Some(count) = profile.author_count(&candidate.author) {
                score += weights.author * count as f64 / author_total;
            }
            if !recent.is_empty() {
                let words = keywords(&candidate.title, &candidate.author, category);
                let similarity =
                    recent.iter().map(|r| keyword_overlap(&words, r)).sum::<f64>() / recent.len() as f64;
                score += weights.history * similarity;
            }
            score += weights.recency * recent_bonus;

            let score = score.clamp(0.0, 1.0);
            (score > 0.0).then(|| RecommendationItem {
                book: candidate.clone(),
                score,
                reasons: Vec::new(),
                user_feedback: None,
                in_wishlist: false,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    if options.exclude_read {
        scored.retain(|item| !read.contains(&item.book.title.to_lowercase()));
    }
    scored.truncate(options.max_recommendations);

    for item in scored.iter_mut() {
        item.reasons = reasons_for(&item.book, profile);
    }
    scored
}

fn category_of(candidate: &CandidateBook) -> &str {
    if candidate.category.trim().is_empty() {
        DEFAULT_CATEGORY
    } else {
        &candidate.category
    }
}

fn reasons_for(candidate: &CandidateBook, profile: &UserProfile<'_>) -> Vec<String> {
    let category = category_of(candidate);
    let mut reasons = Vec::new();

    if let Some(count) = profile.category_count(category) {
        reasons.push(format!("You have read {count} books in {category}"));
    }
    if let Some(count) = profile.author_count(&candidate.author) {
        reasons.push(format!("You have read {count} books by {}", candidate.author));
    }
    if reasons.is_empty()
        && let Some((top, _)) = profile.top_category()
        && top == category
    {
        reasons.push(format!("From your favorite category, {top}"));
    }
    if reasons.is_empty() {
        reasons.push("Matches your reading tendencies".to_string());
    }

    reasons.truncate(MAX_REASONS);
    reasons
}
