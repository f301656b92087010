//! Error types for copy-cache

use std::path::PathBuf;

/// Result type for copy-cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in copy-cache operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache entry '{key}' in store '{store}': {message}")]
    Corrupt {
        store: String,
        key: String,
        message: String,
    },

    #[error("Cache task failed: {0}")]
    Task(String),

    /// Filesystem error from copy-fs
    #[error(transparent)]
    Fs(#[from] copy_fs::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
