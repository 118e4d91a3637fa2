//! Error types for the editing engine.
//!
//! All errors in the system are represented by the [`Error`] enum.
//! Component boundaries turn these into structured results, so an
//! [`Error`] only escapes through the internal `Result<T>` plumbing.

use std::io;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// The core error type for all editing and history operations.
#[derive(ThisError, Debug)]
pub enum Error {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Record (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Invalid file path
    #[error("Invalid file path: {reason}")]
    InvalidPath { reason: String },

    /// Rejected input (empty block list, whitespace-only search text, ...)
    #[error("Validation error: {reason}")]
    ValidationError { reason: String },

    /// A search block could not be located in the content
    #[error("No match for block {block}: {reason}")]
    MatchNotFound { block: usize, reason: String },

    /// A replacement strategy is not available (not registered, missing backend)
    #[error("Strategy unavailable: {strategy}")]
    StrategyUnavailable { strategy: String },

    /// A change record points at a backup that no longer exists
    #[error("Backup {backup_id} missing for {path}")]
    BackupMissing { backup_id: String, path: PathBuf },

    /// Invalid configuration
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    /// Record, group or checkpoint not found
    #[error("Not found: {key}")]
    NotFound { key: String },

    /// Generic unclassified error
    #[error("Error: {0}")]
    Other(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an IO error
    pub fn io(err: io::Error) -> Self {
        Error::Io(err)
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Error::FileNotFound { path: path.into() }
    }

    /// Create an invalid path error
    pub fn invalid_path(reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            reason: reason.into(),
        }
    }

    /// Create a validation error
    pub fn validation_error(reason: impl Into<String>) -> Self {
        Error::ValidationError {
            reason: reason.into(),
        }
    }

    /// Create a match-not-found error for a 1-based block index
    pub fn match_not_found(block: usize, reason: impl Into<String>) -> Self {
        Error::MatchNotFound {
            block,
            reason: reason.into(),
        }
    }

    /// Create a strategy unavailable error
    pub fn strategy_unavailable(strategy: impl Into<String>) -> Self {
        Error::StrategyUnavailable {
            strategy: strategy.into(),
        }
    }

    /// Create a backup missing error
    pub fn backup_missing(backup_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Error::BackupMissing {
            backup_id: backup_id.into(),
            path: path.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(reason: impl Into<String>) -> Self {
        Error::ConfigError {
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Whether this error was raised before any mutation took place.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::ValidationError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::file_not_found("/path/to/file");
        assert!(err.to_string().contains("File not found"));

        let err = Error::match_not_found(2, "no exact line match");
        assert_eq!(err.to_string(), "No match for block 2: no exact line match");

        let err = Error::backup_missing("abc", "src/lib.rs");
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("src/lib.rs"));
    }

    #[test]
    fn test_validation_classification() {
        assert!(Error::validation_error("empty").is_validation());
        assert!(!Error::other("boom").is_validation());
    }
}
