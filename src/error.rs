//! Error types for the project tree engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by tree mutation, traversal and concurrent processing
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Node already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Cannot read content of directory: {0}")]
    CannotReadDirectory(String),

    #[error("Cannot write content to directory: {0}")]
    CannotWriteDirectory(String),

    #[error("Cannot delete the project root")]
    CannotDeleteRoot,

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Panic while visiting {path} ({name}): {message}")]
    TraversalPanic {
        path: String,
        name: String,
        message: String,
    },

    #[error("Work unit {unit} panicked: {message}")]
    WorkerPanic { unit: usize, message: String },

    #[error("Operation canceled")]
    Canceled,

    #[error("Operation timed out")]
    TimedOut,

    #[error("Traversal finished with {count} error(s)")]
    Traversal { count: usize, errors: Vec<TreeError> },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TreeError {
    /// Wrap an I/O error with the on-disk path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TreeError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors derived from the execution context rather than from work
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TreeError::Canceled | TreeError::TimedOut)
    }
}

impl From<config::ConfigError> for TreeError {
    fn from(err: config::ConfigError) -> Self {
        TreeError::Config(err.to_string())
    }
}

/// Crate-wide result alias
pub type Result<T, E = TreeError> = std::result::Result<T, E>;

/// Render a panic payload recovered from a task into a message
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
