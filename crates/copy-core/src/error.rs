//! Error types for copy-core

use std::path::PathBuf;

/// Result type for copy-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in copy-core operations
///
/// Only the configuration variants (`EmptyFrom`, `InvalidOption`) are fatal
/// to a run; everything else is scoped to one pattern or one candidate and
/// is reported through [`PatternFailure`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Pattern {index}: 'from' must not be empty")]
    EmptyFrom { index: usize },

    #[error("Invalid option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    #[error("unable to locate '{from}' at '{absolute_from}'")]
    SourceNotFound { from: String, absolute_from: PathBuf },

    #[error("Using an absolute path for 'to' ('{to}') requires a defined output path")]
    UndefinedOutputPath { to: String },

    #[error("Filter failed for '{path}': {message}")]
    Filter { path: PathBuf, message: String },

    #[error("Transform failed for '{path}': {message}")]
    Transform { path: PathBuf, message: String },

    #[error("Path transform failed for '{path}': {message}")]
    TransformPath { path: PathBuf, message: String },

    #[error("Unable to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid template '{template}': {message}")]
    Template { template: String, message: String },

    #[error("Snapshot failed for '{path}': {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: copy_cache::Error,
    },

    #[error("Task failed: {0}")]
    Task(String),

    /// Cache store error from copy-cache
    #[error(transparent)]
    Cache(#[from] copy_cache::Error),

    /// Filesystem or glob error from copy-fs
    #[error(transparent)]
    Fs(#[from] copy_fs::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_option(option: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.to_string(),
        }
    }

    /// Whether the error aborts a whole run rather than one pattern.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::EmptyFrom { .. } | Self::InvalidOption { .. })
    }
}

/// A pattern-scoped or candidate-scoped failure recorded during a run.
#[derive(Debug, thiserror::Error)]
#[error("pattern {index} ('{from}'): {error}")]
pub struct PatternFailure {
    pub index: usize,
    pub from: String,
    #[source]
    pub error: Error,
}
