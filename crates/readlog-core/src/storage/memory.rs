use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use super::BehaviorStore;
use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::error::{ReadlogError, Result};
use crate::models::{BehaviorSnapshot, FeedbackRecord, WeightVector};

#[derive(Default)]
struct Inner {
    snapshots: HashMap<String, VecDeque<BehaviorSnapshot>>,
    feedback: HashMap<String, Vec<FeedbackRecord>>,
    weights: Option<WeightVector>,
}

/// Process-local store. Nothing survives a restart.
pub struct InMemoryBehaviorStore {
    inner: Mutex<Inner>,
    history_limit: usize,
}

impl Default for InMemoryBehaviorStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl InMemoryBehaviorStore {
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            history_limit: history_limit.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| ReadlogError::poisoned("in-memory store"))
    }
}

impl BehaviorStore for InMemoryBehaviorStore {
    fn append(&self, user_id: &str, snapshot: &BehaviorSnapshot) -> Result<()> {
        let mut inner = self.lock()?;
        let history = inner.snapshots.entry(user_id.to_string()).or_default();
        history.push_back(snapshot.clone());
        while history.len() > self.history_limit {
            history.pop_front();
        }
        Ok(())
    }

    fn read(&self, user_id: &str) -> Result<Vec<BehaviorSnapshot>> {
        let inner = self.lock()?;
        Ok(inner
            .snapshots
            .get(user_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn record_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let mut inner = self.lock()?;
        let entries = inner.feedback.entry(record.user_id.clone()).or_default();
        entries.retain(|r| r.title != record.title);
        entries.push(record.clone());
        Ok(())
    }

    fn feedback(&self, user_id: &str) -> Result<Vec<FeedbackRecord>> {
        let inner = self.lock()?;
        Ok(inner.feedback.get(user_id).cloned().unwrap_or_default())
    }

    fn load_weights(&self) -> Result<Option<WeightVector>> {
        Ok(self.lock()?.weights)
    }

    fn save_weights(&self, weights: &WeightVector) -> Result<()> {
        self.lock()?.weights = Some(*weights);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProfileSummary, Sentiment};

    fn snapshot(user: &str) -> BehaviorSnapshot {
        BehaviorSnapshot::new(user, ProfileSummary::default(), &[])
    }

    #[test]
    fn test_history_is_capped_oldest_first() {
        let store = InMemoryBehaviorStore::new(3);
        let snaps: Vec<BehaviorSnapshot> = (0..5).map(|_| snapshot("u1")).collect();
        for s in &snaps {
            store.append("u1", s).unwrap();
        }

        let history = store.read("u1").unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].id, snaps[2].id);
        assert_eq!(history[2].id, snaps[4].id);
        assert!(store.read("u2").unwrap().is_empty());
    }

    #[test]
    fn test_feedback_latest_wins() {
        let store = InMemoryBehaviorStore::default();
        store
            .record_feedback(&FeedbackRecord::new("u1", "Dune", Sentiment::Positive))
            .unwrap();
        store
            .record_feedback(&FeedbackRecord::new("u1", "Dune", Sentiment::Negative))
            .unwrap();
        store
            .record_feedback(&FeedbackRecord::new("u1", "Emma", Sentiment::Positive))
            .unwrap();

        let feedback = store.feedback("u1").unwrap();
        assert_eq!(feedback.len(), 2);
        let dune = feedback.iter().find(|f| f.title == "Dune").unwrap();
        assert_eq!(dune.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_weights_roundtrip() {
        let store = InMemoryBehaviorStore::default();
        assert!(store.load_weights().unwrap().is_none());
        let w = WeightVector::default().adjusted(Sentiment::Positive);
        store.save_weights(&w).unwrap();
        assert_eq!(store.load_weights().unwrap(), Some(w));
    }
}
