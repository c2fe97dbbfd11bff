//! Error types and Result aliases for confwatch.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using confwatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for confwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A reported or observed path could not be made absolute.
    #[error("failed to resolve path '{}': {reason}", path.display())]
    PathResolution { path: PathBuf, reason: String },

    /// The configuration parser rejected a file.
    #[error("failed to parse '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// The reload trigger could not be delivered.
    #[error("reload trigger failed: {0}")]
    Trigger(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// The underlying notification watcher could not be created.
    #[error("failed to initialize watcher: {0}")]
    Init(String),

    /// A directory could not be watched.
    #[error("failed to watch directory '{}': {reason}", dir.display())]
    WatchInstall { dir: PathBuf, reason: String },

    /// Error delivered asynchronously by the notification channel.
    #[error("notification error: {0}")]
    Notification(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error for `path`.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a path resolution error for `path`.
    pub fn path_resolution(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::PathResolution {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a reload trigger error.
    pub fn trigger(msg: impl Into<String>) -> Self {
        Self::Trigger(msg.into())
    }
}

impl WatcherError {
    /// Create a watch installation error for `dir`.
    pub fn watch_install(dir: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::WatchInstall {
            dir: dir.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap an error delivered by the notification channel.
    pub fn notification(error: impl ToString) -> Self {
        Self::Notification(error.to_string())
    }
}
