//! Append-only activity log
//!
//! Records store/delete/sync events for audit context. Writing is strictly
//! best-effort: a failed log entry must never fail the storage operation
//! that produced it, so every failure is swallowed and reported through
//! `tracing` only.

use crate::db::open_sqlite;
use crate::{Error, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// One audit trail entry
#[derive(Clone, Debug, Serialize)]
pub struct ActivityRecord {
    pub action: String,
    pub entity_kind: Option<String>,
    pub entity_id: Option<String>,
    pub detail: Option<String>,
    pub timestamp: u64,
}

/// Append-only audit trail backed by its own SQLite file.
pub struct ActivityLog {
    /// `None` when the log database could not be opened; recording becomes
    /// a no-op rather than an error.
    conn: Option<Connection>,
}

impl ActivityLog {
    /// Open the activity log, degrading to a disabled log on failure.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let conn = match Self::connect(path.as_ref()) {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!("activity log disabled: {}", e);
                None
            }
        };
        ActivityLog { conn }
    }

    fn connect(path: &Path) -> Result<Connection> {
        let conn = open_sqlite(path, "activity database")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id TEXT,
                details TEXT,
                timestamp INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(conn)
    }

    /// Append an entry. Fire-and-forget: failures are logged, never returned.
    pub fn record(&self, action: &str, entity_kind: &str, entity_id: Option<&str>, detail: &str) {
        if let Err(e) = self.try_record(action, entity_kind, entity_id, detail) {
            tracing::warn!("activity logging failed: {}", e);
        }
    }

    fn try_record(
        &self,
        action: &str,
        entity_kind: &str,
        entity_id: Option<&str>,
        detail: &str,
    ) -> Result<()> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| Error::BackendUnavailable("activity database".into()))?;
        conn.execute(
            "INSERT INTO activity (action, entity_type, entity_id, details, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![action, entity_kind, entity_id, detail, now_unix()],
        )?;
        Ok(())
    }

    /// Most recent entries, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ActivityRecord>> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| Error::BackendUnavailable("activity database".into()))?;

        let mut stmt = conn.prepare(
            "SELECT action, entity_type, entity_id, details, timestamp
             FROM activity ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(ActivityRecord {
                action: row.get(0)?,
                entity_kind: row.get(1)?,
                entity_id: row.get(2)?,
                detail: row.get(3)?,
                timestamp: row.get::<_, i64>(4)? as u64,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
