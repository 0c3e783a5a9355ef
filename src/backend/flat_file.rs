//! Flat directory backend
//!
//! Objects live as plain files in one directory. The identifier is a hash
//! of the original base name and the upload instant plus the original
//! extension, which makes collisions practically impossible without a
//! probe; the theoretical race inside one timestamp tick is an accepted
//! trade-off.

use super::{content_type_for, Backend, ObjectSummary, StoreReceipt, StoredObject};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct FlatFileBackend {
    dir: PathBuf,
}

impl FlatFileBackend {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        FlatFileBackend {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Hash the original name together with the upload instant, keeping the
    /// extension so the stored file stays recognizable and servable.
    fn hashed_name(original: &str) -> String {
        let (stem, ext) = match original.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (original, None),
        };

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = blake3::Hasher::new();
        hasher.update(stem.as_bytes());
        hasher.update(&nanos.to_le_bytes());
        let digest = hex::encode(hasher.finalize().as_bytes());

        match ext {
            Some(ext) => format!("{}.{}", &digest[..32], ext),
            None => digest[..32].to_string(),
        }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        // Identifiers are bare file names; anything path-like is rejected
        // rather than resolved outside the directory.
        if id.is_empty() || id.contains('/') || id.contains('\\') || id == "." || id == ".." {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(self.dir.join(id))
    }

    fn mtime_unix(meta: &std::fs::Metadata) -> Option<u64> {
        meta.modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
    }
}

impl Backend for FlatFileBackend {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn store(
        &self,
        name: &str,
        content: &[u8],
        _content_type: &str,
        original_name: Option<&str>,
    ) -> Result<StoreReceipt> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::BackendUnavailable(format!("upload directory: {}", e)))?;

        let stored_name = Self::hashed_name(original_name.unwrap_or(name));
        let path = self.dir.join(&stored_name);
        std::fs::write(&path, content).map_err(|e| Error::WriteFailure(e.to_string()))?;

        Ok(StoreReceipt {
            id: stored_name.clone(),
            stored_name,
        })
    }

    fn retrieve(&self, id: &str) -> Result<StoredObject> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(Error::NotFound(id.to_string()));
        }

        let content = std::fs::read(&path)?;
        let created_at = std::fs::metadata(&path)
            .ok()
            .as_ref()
            .and_then(Self::mtime_unix);

        Ok(StoredObject {
            id: id.to_string(),
            name: id.to_string(),
            original_name: None,
            size: content.len() as u64,
            content_type: content_type_for(id).to_string(),
            content,
            created_at,
        })
    }

    fn list(&self) -> Result<Vec<ObjectSummary>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            // An empty store that was never written to
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            summaries.push(ObjectSummary {
                id: name.clone(),
                name,
                size: meta.len(),
                created_at: Self::mtime_unix(&meta),
            });
        }
        Ok(summaries)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(Error::NotFound(id.to_string()));
        }
        std::fs::remove_file(&path)?;
        Ok(())
    }
}
