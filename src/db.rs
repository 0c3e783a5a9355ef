//! Shared SQLite connection setup
//!
//! Every embedded store opens its own private connection through this one
//! constructor path; nothing is pooled or shared between components.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;

/// Open (creating if needed) the SQLite database at `path`.
///
/// An unreachable medium maps to [`Error::BackendUnavailable`] so callers
/// can degrade gracefully instead of treating it as fatal.
pub(crate) fn open_sqlite(path: &Path, label: &str) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::BackendUnavailable(format!("{}: {}", label, e)))?;
    }
    Connection::open(path).map_err(|e| Error::BackendUnavailable(format!("{}: {}", label, e)))
}
