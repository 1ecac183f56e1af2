//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Stages call store methods; they never execute SQL directly.

use crate::{error::EtlResult, event::EventLogEntry};
mod lookup;
mod subscriber;
mod usage;
pub use subscriber::SubscriberTable;
use rusqlite::{params, Connection};

pub struct PipelineStore {
    conn: Connection,
}

impl PipelineStore {
    pub fn open(path: &str) -> EtlResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for file-backed databases.
        if !is_memory_path(path) {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Current journal mode, lowercase (`wal`, `memory`, `delete`, ...).
    pub fn journal_mode(&self) -> EtlResult<String> {
        let mode: String = self.conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        Ok(mode.to_lowercase())
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EtlResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EtlResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_subscribers.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_usage.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_weekly_report.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, version: &str, started_at: &str) -> EtlResult<()> {
        self.conn.execute(
            "INSERT INTO run (run_id, version, started_at) VALUES (?1, ?2, ?3)",
            params![run_id, version, started_at],
        )?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> EtlResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (run_id, stage, event_type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![entry.run_id, entry.stage, entry.event_type, entry.payload],
        )?;
        Ok(())
    }

    pub fn events_for_run(&self, run_id: &str) -> EtlResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, stage, event_type, payload
             FROM event_log WHERE run_id = ?1
             ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![run_id], |row| {
                Ok(EventLogEntry {
                    id:         Some(row.get(0)?),
                    run_id:     row.get(1)?,
                    stage:      row.get(2)?,
                    event_type: row.get(3)?,
                    payload:    row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str, event_type: &str) -> EtlResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1 AND event_type = ?2",
            params![run_id, event_type],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

/// Quote an identifier for use in generated SQL.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `:memory:`, anonymous temp databases and `mode=memory` URIs.
fn is_memory_path(path: &str) -> bool {
    path.is_empty()
        || path == ":memory:"
        || path.starts_with("file::memory:")
        || (path.starts_with("file:") && path.contains("mode=memory"))
}
