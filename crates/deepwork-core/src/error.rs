//! Core error types for deepwork-core.
//!
//! Validation and transition errors are deterministic functions of the
//! current session state and the caller's input. Neither is ever produced
//! after a mutation has been applied.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::{SessionStatus, TransitionAction};

/// Core error type for deepwork-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Current session state does not permit the requested operation
    #[error("{0}")]
    InvalidTransition(#[from] TransitionError),

    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn session_not_found(id: i64) -> Self {
        CoreError::NotFound {
            entity: "Session",
            id,
        }
    }
}

/// Input validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is empty or whitespace
    #[error("'{field}' cannot be empty")]
    EmptyField { field: &'static str },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

/// Returned when an operation is attempted from a state that does not allow it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Session can only be {verb} if it's {required}, but it is {from}", verb = .action.past_tense(), required = .action.required_states())]
pub struct TransitionError {
    pub action: TransitionAction,
    pub from: SessionStatus,
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

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored row could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    Corrupt { table: &'static str, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Key does not name a configuration value
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_message_names_action_and_state() {
        let err = TransitionError {
            action: TransitionAction::Pause,
            from: SessionStatus::Planned,
        };
        assert_eq!(
            err.to_string(),
            "Session can only be paused if it's active, but it is planned"
        );
    }

    #[test]
    fn complete_error_lists_both_source_states() {
        let err = TransitionError {
            action: TransitionAction::Complete,
            from: SessionStatus::Overdue,
        };
        assert!(err.to_string().contains("active or paused"));
    }

    #[test]
    fn not_found_message() {
        assert_eq!(CoreError::session_not_found(42).to_string(), "Session 42 not found");
    }
}
