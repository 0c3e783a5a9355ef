//! Short link registry
//!
//! Maps generated short codes to target URLs with access-count tracking.
//! Codes are drawn from the uniqueness protocol in [`crate::codegen`];
//! target URLs are validated but stored verbatim: trailing slashes, query
//! strings, and case are preserved exactly as submitted.

use crate::activity::ActivityLog;
use crate::codegen;
use crate::db::open_sqlite;
use crate::sync::{Clock, DirtyFlag, SystemClock};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// A stored redirect
#[derive(Clone, Debug, Serialize)]
pub struct ShortLink {
    pub code: String,
    pub url: String,
    pub title: Option<String>,
    pub created_at: u64,
    /// Unix seconds of the last resolve; `None` until the first one
    pub last_access: Option<u64>,
    pub clicks: u64,
}

pub struct LinkRegistry {
    conn: Connection,
    activity: ActivityLog,
    dirty: DirtyFlag,
    clock: Arc<dyn Clock>,
    code_len: usize,
}

impl LinkRegistry {
    /// Open the registry, creating the schema on first use.
    pub fn open(path: impl AsRef<Path>, activity: ActivityLog, dirty: DirtyFlag) -> Result<Self> {
        let conn = open_sqlite(path.as_ref(), "links database")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT UNIQUE NOT NULL,
                long_url TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                last_access INTEGER,
                clicks INTEGER NOT NULL DEFAULT 0,
                title TEXT
            )",
            [],
        )
        .map_err(|e| Error::BackendUnavailable(format!("links schema: {}", e)))?;

        Ok(LinkRegistry {
            conn,
            activity,
            dirty,
            clock: Arc::new(SystemClock),
            code_len: codegen::DEFAULT_CODE_LEN,
        })
    }

    /// Replace the wall clock (for tests)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Shorten a URL, returning the generated code.
    pub fn shorten(&self, url: &str, title: Option<&str>) -> Result<String> {
        // Validation only; the stored string stays verbatim.
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        if !parsed.has_host() {
            return Err(Error::InvalidUrl(format!("{}: missing host", url)));
        }

        let code = codegen::unique_code(self.code_len, |candidate| self.code_exists(candidate))?;

        self.conn
            .execute(
                "INSERT INTO links (short_code, long_url, title, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![code, url, title, self.clock.now() as i64],
            )
            .map_err(|e| Error::WriteFailure(e.to_string()))?;

        self.activity.record(
            "link_create",
            "link",
            Some(&code),
            &format!("Created short link: {} -> {}", code, url),
        );
        self.dirty.mark();

        Ok(code)
    }

    /// Resolve a code to its target URL, counting the access.
    ///
    /// The counter increment and last-access update happen in one UPDATE
    /// statement together with the existence check, so a successful lookup
    /// can never skip the bump.
    pub fn resolve(&self, code: &str) -> Result<String> {
        let affected = self.conn.execute(
            "UPDATE links SET clicks = clicks + 1, last_access = ?1 WHERE short_code = ?2",
            params![self.clock.now() as i64, code],
        )?;
        if affected == 0 {
            return Err(Error::NotFound(code.to_string()));
        }

        let url = self.conn.query_row(
            "SELECT long_url FROM links WHERE short_code = ?1",
            [code],
            |row| row.get(0),
        )?;
        Ok(url)
    }

    /// Look up a link without counting an access.
    pub fn get(&self, code: &str) -> Result<ShortLink> {
        self.conn
            .query_row(
                "SELECT short_code, long_url, title, created_at, last_access, clicks
                 FROM links WHERE short_code = ?1",
                [code],
                Self::link_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(code.to_string()))
    }

    /// All links, newest-created first.
    pub fn list(&self) -> Result<Vec<ShortLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT short_code, long_url, title, created_at, last_access, clicks
             FROM links ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::link_from_row)?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }

    fn code_exists(&self, code: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM links WHERE short_code = ?1", [code], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn link_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShortLink> {
        Ok(ShortLink {
            code: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            created_at: row.get::<_, i64>(3)? as u64,
            last_access: row.get::<_, Option<i64>>(4)?.map(|t| t as u64),
            clicks: row.get::<_, i64>(5)? as u64,
        })
    }
}
