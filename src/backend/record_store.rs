//! Embedded record store backend
//!
//! Payloads live as BLOB rows in a private SQLite database; identifiers are
//! the auto-assigned row ids surfaced as strings. This is the backend the
//! deferred sync machinery hangs off: every successful mutation appends an
//! activity record and marks the shared dirty flag so the coordinator knows
//! local state has diverged from the remote.

use super::{Backend, ObjectSummary, StoreReceipt, StoredObject};
use crate::activity::ActivityLog;
use crate::db::open_sqlite;
use crate::sync::{Clock, DirtyFlag, SystemClock};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

pub struct RecordStoreBackend {
    conn: Connection,
    activity: ActivityLog,
    dirty: DirtyFlag,
    clock: Arc<dyn Clock>,
}

impl RecordStoreBackend {
    /// Open the store, creating the schema on first use.
    pub fn open(
        path: impl AsRef<Path>,
        activity: ActivityLog,
        dirty: DirtyFlag,
    ) -> Result<Self> {
        let conn = open_sqlite(path.as_ref(), "files database")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                content BLOB,
                content_type TEXT,
                size INTEGER,
                uploaded_at INTEGER NOT NULL,
                original_name TEXT
            )",
            [],
        )
        .map_err(|e| Error::BackendUnavailable(format!("files schema: {}", e)))?;

        Ok(RecordStoreBackend {
            conn,
            activity,
            dirty,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the wall clock (for tests)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn parse_id(id: &str) -> Result<i64> {
        id.parse().map_err(|_| Error::NotFound(id.to_string()))
    }
}

impl Backend for RecordStoreBackend {
    fn name(&self) -> &'static str {
        "record"
    }

    fn store(
        &self,
        name: &str,
        content: &[u8],
        content_type: &str,
        original_name: Option<&str>,
    ) -> Result<StoreReceipt> {
        self.conn
            .execute(
                "INSERT INTO files (filename, content, content_type, size, uploaded_at, original_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    name,
                    content,
                    content_type,
                    content.len() as i64,
                    self.clock.now() as i64,
                    original_name,
                ],
            )
            .map_err(|e| Error::WriteFailure(e.to_string()))?;

        let id = self.conn.last_insert_rowid().to_string();
        self.activity.record(
            "file_upload",
            "file",
            Some(&id),
            &format!("Uploaded file: {}", original_name.unwrap_or(name)),
        );
        self.dirty.mark();

        Ok(StoreReceipt {
            id,
            stored_name: name.to_string(),
        })
    }

    fn retrieve(&self, id: &str) -> Result<StoredObject> {
        let row_id = Self::parse_id(id)?;

        let row = self
            .conn
            .query_row(
                "SELECT filename, content, content_type, size, uploaded_at, original_name
                 FROM files WHERE id = ?1",
                [row_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                },
            )
            .optional()?;

        let (name, content, content_type, size, uploaded_at, original_name) =
            row.ok_or_else(|| Error::NotFound(id.to_string()))?;

        Ok(StoredObject {
            id: id.to_string(),
            name,
            original_name,
            content,
            content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
            size: size as u64,
            created_at: Some(uploaded_at as u64),
        })
    }

    /// Listing is ordered by creation time, newest first.
    fn list(&self) -> Result<Vec<ObjectSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, size, uploaded_at
             FROM files ORDER BY uploaded_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ObjectSummary {
                id: row.get::<_, i64>(0)?.to_string(),
                name: row.get(1)?,
                size: row.get::<_, i64>(2)? as u64,
                created_at: Some(row.get::<_, i64>(3)? as u64),
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let row_id = Self::parse_id(id)?;

        let affected = self
            .conn
            .execute("DELETE FROM files WHERE id = ?1", [row_id])?;
        if affected == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        self.activity.record(
            "file_delete",
            "file",
            Some(id),
            &format!("Deleted file ID: {}", id),
        );
        self.dirty.mark();
        Ok(())
    }
}
