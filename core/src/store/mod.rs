//! SQLite adapter.
//!
//! RULE: Only store/ talks to the database.
//! The engine never sees a connection; it gets Tables in and hands
//! typed results back for the store to write.

use crate::{error::FlowResult, types::RunId};
use rusqlite::{params, Connection};

mod input;
mod output;

pub struct FlowStore {
    conn: Connection,
}

impl FlowStore {
    pub fn open(path: &str) -> FlowResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FlowResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> FlowResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_analysis.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> FlowResult<()> {
        let started_at = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO analysis_run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, started_at],
        )?;
        Ok(())
    }

    pub fn run_exists(&self, run_id: &str) -> FlowResult<bool> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM analysis_run WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n > 0)
    }
}

/// A fresh run identifier.
pub fn new_run_id() -> RunId {
    format!("run-{}", uuid::Uuid::new_v4())
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}
