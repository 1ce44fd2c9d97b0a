use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::schema::{apply_pragmas, create_tables, current_version};
use super::BehaviorStore;
use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::error::{ReadlogError, Result};
use crate::models::{BehaviorSnapshot, FeedbackRecord, Sentiment, WeightVector};

/// SQLite-backed store. Snapshots are kept as JSON payloads.
pub struct SqliteBehaviorStore {
    path: Option<String>,
    connection: Mutex<Connection>,
    history_limit: usize,
}

impl SqliteBehaviorStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_string_lossy().to_string()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<String>) -> Result<Self> {
        apply_pragmas(&conn)?;
        create_tables(&conn)?;
        tracing::debug!(path = path.as_deref().unwrap_or(":memory:"), "behavior store opened");
        Ok(Self {
            path,
            connection: Mutex::new(conn),
            history_limit: DEFAULT_HISTORY_LIMIT,
        })
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> Result<u32> {
        current_version(&*self.conn()?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| ReadlogError::poisoned("sqlite connection"))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ReadlogError::Store(format!("bad timestamp {raw:?}: {e}")))
}

impl BehaviorStore for SqliteBehaviorStore {
    fn append(&self, user_id: &str, snapshot: &BehaviorSnapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO behavior_snapshots (id, user_id, created_at, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                snapshot.id.to_string(),
                user_id,
                snapshot.timestamp.to_rfc3339(),
                payload
            ],
        )?;
        tx.execute(
            "DELETE FROM behavior_snapshots
             WHERE user_id = ?1 AND seq NOT IN (
                 SELECT seq FROM behavior_snapshots WHERE user_id = ?1 ORDER BY seq DESC LIMIT ?2
             )",
            params![user_id, self.history_limit as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn read(&self, user_id: &str) -> Result<Vec<BehaviorSnapshot>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT payload FROM behavior_snapshots WHERE user_id = ?1 ORDER BY seq ASC")?;
        let rows = stmt.query_map([user_id], |row| row.get::<_, String>(0))?;

        let mut snapshots = Vec::new();
        for row in rows {
            let payload = row?;
            match serde_json::from_str::<BehaviorSnapshot>(&payload) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => tracing::warn!(user_id, error = %e, "skipping unreadable snapshot"),
            }
        }
        Ok(snapshots)
    }

    fn record_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO recommendation_feedback (user_id, title, sentiment, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, title) DO UPDATE SET
                 sentiment = excluded.sentiment,
                 created_at = excluded.created_at",
            params![
                record.user_id,
                record.title,
                record.sentiment.to_string(),
                record.timestamp.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn feedback(&self, user_id: &str) -> Result<Vec<FeedbackRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT title, sentiment, created_at FROM recommendation_feedback
             WHERE user_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([user_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (title, sentiment, created_at) = row?;
            records.push(FeedbackRecord {
                user_id: user_id.to_string(),
                title,
                sentiment: sentiment.parse::<Sentiment>().map_err(ReadlogError::Store)?,
                timestamp: parse_timestamp(&created_at)?,
            });
        }
        Ok(records)
    }

    fn load_weights(&self) -> Result<Option<WeightVector>> {
        let conn = self.conn()?;
        let weights = conn
            .query_row(
                "SELECT category, author, history, recency FROM engine_weights WHERE id = 1",
                [],
                |row| {
                    Ok(WeightVector {
                        category: row.get(0)?,
                        author: row.get(1)?,
                        history: row.get(2)?,
                        recency: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(weights)
    }

    fn save_weights(&self, weights: &WeightVector) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO engine_weights (id, category, author, history, recency, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 category = excluded.category,
                 author = excluded.author,
                 history = excluded.history,
                 recency = excluded.recency,
                 updated_at = excluded.updated_at",
            params![
                weights.category,
                weights.author,
                weights.history,
                weights.recency,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileSummary;
    use tempfile::tempdir;

    fn snapshot(user: &str) -> BehaviorSnapshot {
        BehaviorSnapshot::new(user, ProfileSummary::default(), &[])
    }

    #[test]
    fn test_append_and_cap() {
        let store = SqliteBehaviorStore::open_in_memory()
            .unwrap()
            .with_history_limit(2);
        let snaps: Vec<BehaviorSnapshot> = (0..4).map(|_| snapshot("u1")).collect();
        for s in &snaps {
            store.append("u1", s).unwrap();
        }
        store.append("u2", &snapshot("u2")).unwrap();

        let history = store.read("u1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, snaps[2].id);
        assert_eq!(history[1].id, snaps[3].id);
        assert_eq!(store.read("u2").unwrap().len(), 1);
    }

    #[test]
    fn test_feedback_upsert() {
        let store = SqliteBehaviorStore::open_in_memory().unwrap();
        store
            .record_feedback(&FeedbackRecord::new("u1", "Dune", Sentiment::Positive))
            .unwrap();
        store
            .record_feedback(&FeedbackRecord::new("u1", "Dune", Sentiment::Negative))
            .unwrap();

        let feedback = store.feedback("u1").unwrap();
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].sentiment, Sentiment::Negative);
        assert!(store.feedback("u2").unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("behavior.db");
        let weights = WeightVector::default().adjusted(Sentiment::Negative);

        {
            let store = SqliteBehaviorStore::open(&path).unwrap();
            assert!(store.load_weights().unwrap().is_none());
            store.append("u1", &snapshot("u1")).unwrap();
            store.save_weights(&weights).unwrap();
        }

        let store = SqliteBehaviorStore::open(&path).unwrap();
        assert_eq!(store.read("u1").unwrap().len(), 1);
        let loaded = store.load_weights().unwrap().unwrap();
        assert!((loaded.category - weights.category).abs() < 1e-12);
        assert_eq!(store.path(), Some(path.to_string_lossy().as_ref()));
        assert_eq!(store.schema_version().unwrap(), crate::storage::SCHEMA_VERSION);
    }
}
