//! Storage backends
//!
//! A [`Backend`] is a polymorphic capability over store/retrieve/list/delete
//! for one storage medium. Three variants ship: a flat directory of
//! content-addressed files, a git working tree, and an embedded SQLite
//! store. Backends are independent of each other; an identifier is only
//! meaningful within the backend that issued it.

mod flat_file;
mod record_store;
mod vcs_tree;

pub use flat_file::FlatFileBackend;
pub use record_store::RecordStoreBackend;
pub use vcs_tree::VcsTreeBackend;

use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Returned by a successful store
#[derive(Clone, Debug, Serialize)]
pub struct StoreReceipt {
    /// Identifier for subsequent retrieve/delete calls
    pub id: String,
    /// Name the payload was stored under
    pub stored_name: String,
}

/// A fully materialized object, as returned by retrieve
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub id: String,
    pub name: String,
    pub original_name: Option<String>,
    pub content: Vec<u8>,
    pub content_type: String,
    pub size: u64,
    /// Unix seconds; `None` where the medium does not track it
    pub created_at: Option<u64>,
}

/// One row of a listing
#[derive(Clone, Debug, Serialize)]
pub struct ObjectSummary {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub created_at: Option<u64>,
}

/// Common contract over one storage medium.
pub trait Backend {
    /// Short stable name used for registry lookup
    fn name(&self) -> &'static str;

    /// Durably store a payload. On success the object is visible to
    /// `retrieve` under the returned id and to `list`.
    fn store(
        &self,
        name: &str,
        content: &[u8],
        content_type: &str,
        original_name: Option<&str>,
    ) -> Result<StoreReceipt>;

    /// Fetch an object by id. Never searches other backends.
    fn retrieve(&self, id: &str) -> Result<StoredObject>;

    /// Snapshot of the backend's objects. Ordering is unspecified unless
    /// the variant documents one.
    fn list(&self) -> Result<Vec<ObjectSummary>>;

    /// Remove an object. Deleting an absent id fails with `NotFound`;
    /// a second delete of the same id is expected to fail, not silently
    /// succeed.
    fn delete(&self, id: &str) -> Result<()>;
}

/// Explicit name → backend map, injected into callers.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<&'static str, Box<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        BackendRegistry::default()
    }

    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.insert(backend.name(), backend);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Backend> {
        self.backends
            .get(name)
            .map(|b| b.as_ref())
            .ok_or_else(|| Error::UnknownBackend(name.to_string()))
    }

    /// Registered backend names, sorted for stable output
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.backends.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Best-effort content type from a file extension.
///
/// Media stored outside the record store do not persist a content type, so
/// retrieval infers one the same way the serving layer would.
pub(crate) fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "md" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        _ => "application/octet-stream",
    }
}
