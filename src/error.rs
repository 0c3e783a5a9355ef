//! Error types for depot

use thiserror::Error;

/// Result type alias for depot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in depot operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Write failed: {0}")]
    WriteFailure(String),

    #[error("Code space exhausted after {0} attempts")]
    CodeSpaceExhausted(usize),

    #[error("Git command failed: {0}")]
    VcsCommand(String),

    #[error("Stage failed: {0}")]
    StageFailure(String),

    #[error("Commit failed: {0}")]
    CommitFailure(String),

    #[error("Push failed: {0}")]
    PushFailure(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error means the requested entity does not exist,
    /// as opposed to an operational failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
