//! Core error types for pomodorox-core.
//!
//! The transition function is total and never produces one of these; they
//! come from the collaborators around it (storage, settings, export) and are
//! either surfaced to an explicit user action or logged and swallowed by the
//! driver.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pomodorox-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Settings-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The timer driver is no longer running.
    #[error("timer driver has shut down")]
    DriverClosed,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Data directory could not be resolved or created
    #[error("Failed to prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored row could not be decoded
    #[error("Corrupt record in '{table}': {message}")]
    Corrupt { table: &'static str, message: String },

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Settings-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Unknown dot-path key
    #[error("unknown settings key: {0}")]
    UnknownKey(String),

    /// Invalid value for a known key
    #[error("Invalid settings value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse a settings document
    #[error("Failed to parse settings: {0}")]
    ParseFailed(String),

    /// Failed to serialize settings
    #[error("Failed to serialize settings: {0}")]
    SerializeFailed(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid date range
    #[error("Invalid date range: end ({end}) is before start ({start})")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },
}

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Custom range without both bounds
    #[error("Custom date range requires start and end dates")]
    MissingCustomRange,

    /// Nothing selected for export
    #[error("Nothing selected for export")]
    EmptySelection,

    /// Writing the export file failed
    #[error("Failed to write export to {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Completion sound/notification errors. Always logged, never surfaced.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification backend unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SerializeFailed(err.to_string())
    }
}
