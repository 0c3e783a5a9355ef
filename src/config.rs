//! Configuration for the storage core
//!
//! All paths and sync parameters in one place. Loadable from a JSON file,
//! with defaults rooted under the platform data directory.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default interval between syncs to the data branch, in seconds
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600;

/// Depot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the flat-file backend
    pub flat_dir: PathBuf,
    /// Working tree for the version-controlled backend
    pub vcs_dir: PathBuf,
    /// Directory whose contents are staged and pushed by the sync job
    pub data_dir: PathBuf,
    /// SQLite file for stored objects
    pub files_db: PathBuf,
    /// SQLite file for short links
    pub links_db: PathBuf,
    /// SQLite file for the activity log
    pub activity_db: PathBuf,
    /// File holding the timestamp of the last successful sync
    pub watermark_file: PathBuf,
    /// Repository the sync job commits and pushes from
    pub repo_dir: PathBuf,
    /// Seconds between syncs
    pub sync_interval_secs: u64,
    /// Remote to push to
    pub sync_remote: String,
    /// Branch to push
    pub sync_branch: String,
    /// Wall-clock bound for a single git invocation, in seconds
    pub git_timeout_secs: u64,
}

impl Config {
    /// Configuration with every path rooted under `root`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let data_dir = root.join("data");
        Config {
            flat_dir: root.join("uploads"),
            vcs_dir: root.join("git-repo"),
            files_db: data_dir.join("files.db"),
            links_db: data_dir.join("links.db"),
            activity_db: data_dir.join("activity.db"),
            watermark_file: data_dir.join("last_sync"),
            data_dir,
            repo_dir: root.to_path_buf(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            sync_remote: "origin".to_string(),
            sync_branch: "main".to_string(),
            git_timeout_secs: 30,
        }
    }

    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Write configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.as_ref(), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl Default for Config {
    /// Defaults under the platform data directory (e.g. ~/.local/share/depot)
    fn default() -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("depot");
        Config::with_root(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_with_root_places_stores_under_root() {
        let config = Config::with_root("/srv/depot");
        assert_eq!(config.flat_dir, PathBuf::from("/srv/depot/uploads"));
        assert_eq!(config.files_db, PathBuf::from("/srv/depot/data/files.db"));
        assert_eq!(config.watermark_file, PathBuf::from("/srv/depot/data/last_sync"));
        assert_eq!(config.sync_interval_secs, DEFAULT_SYNC_INTERVAL_SECS);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::with_root(dir.path());
        config.sync_interval_secs = 60;
        config.sync_branch = "data".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.sync_interval_secs, 60);
        assert_eq!(loaded.sync_branch, "data");
        assert_eq!(loaded.vcs_dir, config.vcs_dir);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Config::load("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
