use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 1;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS behavior_snapshots (
            seq        INTEGER PRIMARY KEY AUTOINCREMENT,
            id         TEXT UNIQUE NOT NULL,
            user_id    TEXT NOT NULL,
            created_at TEXT NOT NULL,
            payload    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_snapshots_user ON behavior_snapshots(user_id, seq);

        CREATE TABLE IF NOT EXISTS recommendation_feedback (
            user_id    TEXT NOT NULL,
            title      TEXT NOT NULL,
            sentiment  TEXT NOT NULL CHECK(sentiment IN ('positive', 'negative')),
            created_at TEXT NOT NULL,
            PRIMARY KEY (user_id, title)
        );

        CREATE TABLE IF NOT EXISTS engine_weights (
            id         INTEGER PRIMARY KEY CHECK(id = 1),
            category   REAL NOT NULL,
            author     REAL NOT NULL,
            history    REAL NOT NULL,
            recency    REAL NOT NULL,
            updated_at TEXT NOT NULL
        );
        ",
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}
