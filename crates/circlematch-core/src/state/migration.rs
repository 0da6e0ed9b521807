use rusqlite::{Connection, params};

use crate::error::{MatchError, Result};

use super::SqliteStateStore;

pub(super) const SCHEMA_VERSION: &str = "1";
const SCHEMA_VERSION_KEY: &str = "schema_version";

const MIGRATION_SCHEMA_SQL: &str = r"
    PRAGMA journal_mode = WAL;
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS system_kv (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        birth_date TEXT,
        gender TEXT CHECK(gender IS NULL OR gender IN ('male', 'female', 'non_binary', 'other')),
        interests_json TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS waitlist_entries (
        occurrence_key TEXT NOT NULL,
        occurrence_date TEXT NOT NULL,
        slot_label TEXT NOT NULL,
        user_id TEXT NOT NULL,
        joined_at TEXT NOT NULL,
        PRIMARY KEY(occurrence_key, user_id),
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS circles (
        id TEXT PRIMARY KEY,
        occurrence_key TEXT NOT NULL,
        occurrence_date TEXT NOT NULL,
        slot_label TEXT NOT NULL,
        sequence INTEGER NOT NULL,
        location TEXT NOT NULL,
        prompt TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE(occurrence_key, sequence)
    );

    CREATE TABLE IF NOT EXISTS circle_members (
        circle_id TEXT NOT NULL,
        occurrence_key TEXT NOT NULL,
        user_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY(circle_id, user_id),
        UNIQUE(occurrence_key, user_id),
        FOREIGN KEY (circle_id) REFERENCES circles(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS matching_runs (
        occurrence_key TEXT PRIMARY KEY,
        occurrence_date TEXT NOT NULL,
        slot_label TEXT NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('in_progress', 'done', 'failed')),
        attempts INTEGER NOT NULL DEFAULT 0,
        started_at TEXT NOT NULL,
        finished_at TEXT,
        error TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_waitlist_entries_occurrence
    ON waitlist_entries(occurrence_key, joined_at);
    CREATE INDEX IF NOT EXISTS idx_circles_occurrence ON circles(occurrence_key, sequence);
    CREATE INDEX IF NOT EXISTS idx_circle_members_user ON circle_members(user_id);
";

impl SqliteStateStore {
    pub fn migrate(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| MatchError::mutex_poisoned("sqlite"))?;
        conn.execute_batch(MIGRATION_SCHEMA_SQL)?;
        ensure_required_column(
            &conn,
            "circles",
            "sequence",
            "unsupported circles schema: sequence is missing; reset state database",
        )?;
        ensure_required_column(
            &conn,
            "matching_runs",
            "attempts",
            "unsupported matching_runs schema: attempts is missing; reset state database",
        )?;
        conn.execute(
            r"
            INSERT INTO system_kv(key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO NOTHING
            ",
            params![SCHEMA_VERSION_KEY, SCHEMA_VERSION],
        )?;
        drop(conn);
        Ok(())
    }
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for row in rows {
        if row? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn ensure_required_column(
    conn: &Connection,
    table: &str,
    column: &str,
    error_message: &'static str,
) -> Result<()> {
    if has_column(conn, table, column)? {
        Ok(())
    } else {
        Err(MatchError::Validation(error_message.to_string()))
    }
}
