use std::sync::Arc;

use super::{AsyncBehaviorStore, BehaviorStore};
use crate::error::{ReadlogError, Result};
use crate::models::{BehaviorSnapshot, FeedbackRecord, WeightVector};

/// Runs a synchronous [`BehaviorStore`] on tokio's blocking pool.
pub struct BlockingStore<S> {
    inner: Arc<S>,
}

impl<S> BlockingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }
}

impl<S> Clone for BlockingStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: BehaviorStore + 'static> BlockingStore<S> {
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&S) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| ReadlogError::Store(format!("blocking task failed: {e}")))?
    }
}

#[async_trait::async_trait]
impl<S: BehaviorStore + 'static> AsyncBehaviorStore for BlockingStore<S> {
    async fn append(&self, user_id: &str, snapshot: &BehaviorSnapshot) -> Result<()> {
        let user_id = user_id.to_string();
        let snapshot = snapshot.clone();
        self.run(move |s| s.append(&user_id, &snapshot)).await
    }

    async fn read(&self, user_id: &str) -> Result<Vec<BehaviorSnapshot>> {
        let user_id = user_id.to_string();
        self.run(move |s| s.read(&user_id)).await
    }

    async fn record_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let record = record.clone();
        self.run(move |s| s.record_feedback(&record)).await
    }

    async fn feedback(&self, user_id: &str) -> Result<Vec<FeedbackRecord>> {
        let user_id = user_id.to_string();
        self.run(move |s| s.feedback(&user_id)).await
    }

    async fn load_weights(&self) -> Result<Option<WeightVector>> {
        self.run(|s| s.load_weights()).await
    }

    async fn save_weights(&self, weights: &WeightVector) -> Result<()> {
        let weights = *weights;
        self.run(move |s| s.save_weights(&weights)).await
    }
}
