//! Persistence for recommendation snapshots, feedback and engine weights.
//!
//! Every write is best-effort from the engine's point of view: a failing
//! store is logged and never changes the recommendations returned.

mod memory;
mod schema;
mod sqlite;

#[cfg(feature = "async")]
mod blocking;

use std::sync::Arc;

pub use memory::InMemoryBehaviorStore;
pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteBehaviorStore;

#[cfg(feature = "async")]
pub use blocking::BlockingStore;

use crate::error::Result;
use crate::models::{BehaviorSnapshot, FeedbackRecord, WeightVector};

pub trait BehaviorStore: Send + Sync {
    /// Append a snapshot, dropping the oldest beyond the store's per-user limit.
    fn append(&self, user_id: &str, snapshot: &BehaviorSnapshot) -> Result<()>;

    /// Snapshots for `user_id`, oldest first.
    fn read(&self, user_id: &str) -> Result<Vec<BehaviorSnapshot>>;

    /// Insert or replace the feedback for `(user_id, title)`.
    fn record_feedback(&self, record: &FeedbackRecord) -> Result<()>;

    fn feedback(&self, user_id: &str) -> Result<Vec<FeedbackRecord>>;

    fn load_weights(&self) -> Result<Option<WeightVector>> {
        Ok(None)
    }

    fn save_weights(&self, _weights: &WeightVector) -> Result<()> {
        Ok(())
    }
}

impl<S: BehaviorStore + ?Sized> BehaviorStore for Arc<S> {
    fn append(&self, user_id: &str, snapshot: &BehaviorSnapshot) -> Result<()> {
        (**self).append(user_id, snapshot)
    }

    fn read(&self, user_id: &str) -> Result<Vec<BehaviorSnapshot>> {
        (**self).read(user_id)
    }

    fn record_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        (**self).record_feedback(record)
    }

    fn feedback(&self, user_id: &str) -> Result<Vec<FeedbackRecord>> {
        (**self).feedback(user_id)
    }

    fn load_weights(&self) -> Result<Option<WeightVector>> {
        (**self).load_weights()
    }

    fn save_weights(&self, weights: &WeightVector) -> Result<()> {
        (**self).save_weights(weights)
    }
}

#[cfg(feature = "async")]
#[async_trait::async_trait]
pub trait AsyncBehaviorStore: Send + Sync {
    async fn append(&self, user_id: &str, snapshot: &BehaviorSnapshot) -> Result<()>;
    async fn read(&self, user_id: &str) -> Result<Vec<BehaviorSnapshot>>;
    async fn record_feedback(&self, record: &FeedbackRecord) -> Result<()>;
    async fn feedback(&self, user_id: &str) -> Result<Vec<FeedbackRecord>>;
    async fn load_weights(&self) -> Result<Option<WeightVector>>;
    async fn save_weights(&self, weights: &WeightVector) -> Result<()>;
}
