//! Error types for Questline.
//!
//! Questline uses a hierarchical error system:
//! - `QuestlineError` is the top-level error returned by all public APIs
//! - Specific error types (`StorageError`, `ValidationError`, `NotFoundError`)
//!   provide detail
//!
//! Storage errors are safe to retry at the operation level: every engine
//! operation re-reads current state, so a retried call composes correctly.
//! Not-found errors are terminal and should surface to the user.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use questline::{Questline, Config, Result};
//!
//! fn example() -> Result<()> {
//!     let db = Questline::open("./questline.db", Config::default())?;
//!     // ... operations that may fail ...
//!     db.close()?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Questline operations.
pub type Result<T> = std::result::Result<T, QuestlineError>;

/// Top-level error enum for all Questline operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum QuestlineError {
    /// Storage layer error (I/O, corruption, transactions).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QuestlineError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    ///
    /// Storage errors indicate a failed read or write with no partial
    /// mutation; the caller may retry the whole operation.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Storage-related errors.
///
/// These errors indicate problems with the underlying storage layer.
/// The engine performs no partial commits, so after any of these the
/// affected records are exactly as they were before the call.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database file or data is corrupted.
    #[error("Database corrupted: {0}")]
    Corrupted(String),

    /// Database file not found at expected path.
    #[error("Database not found: {0}")]
    DatabaseNotFound(PathBuf),

    /// Database is locked by another process.
    #[error("Database is locked by another writer")]
    DatabaseLocked,

    /// Transaction failed (commit, rollback, etc.).
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the redb storage engine.
    #[error("Storage engine error: {0}")]
    Redb(String),

    /// Database schema version doesn't match expected version.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version.
        expected: u32,
        /// Actual schema version found in database.
        found: u32,
    },
}

impl StorageError {
    /// Creates a corruption error with the given message.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Creates a transaction error with the given message.
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a redb error with the given message.
    pub fn redb(msg: impl Into<String>) -> Self {
        Self::Redb(msg.into())
    }
}

// Conversions from redb error types
impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(format!("Commit failed: {}", err))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Redb(format!("Table error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Redb(format!("Storage error: {}", err))
    }
}

// Convert bincode errors to StorageError
impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// Also allow direct conversion to QuestlineError for convenience
impl From<redb::Error> for QuestlineError {
    fn from(err: redb::Error) -> Self {
        QuestlineError::Storage(StorageError::from(err))
    }
}

impl From<redb::DatabaseError> for QuestlineError {
    fn from(err: redb::DatabaseError) -> Self {
        QuestlineError::Storage(StorageError::from(err))
    }
}

impl From<redb::TransactionError> for QuestlineError {
    fn from(err: redb::TransactionError) -> Self {
        QuestlineError::Storage(StorageError::from(err))
    }
}

impl From<redb::CommitError> for QuestlineError {
    fn from(err: redb::CommitError) -> Self {
        QuestlineError::Storage(StorageError::from(err))
    }
}

impl From<redb::TableError> for QuestlineError {
    fn from(err: redb::TableError) -> Self {
        QuestlineError::Storage(StorageError::from(err))
    }
}

impl From<redb::StorageError> for QuestlineError {
    fn from(err: redb::StorageError) -> Self {
        QuestlineError::Storage(StorageError::from(err))
    }
}

impl From<bincode::Error> for QuestlineError {
    fn from(err: bincode::Error) -> Self {
        QuestlineError::Storage(StorageError::from(err))
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
/// The core delta application performs no input validation beyond user
/// existence; these cover the boundary inputs (mission creation, config).
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Level width doesn't match the width locked into the database.
    #[error("Level width mismatch: expected {expected}, got {got}")]
    LevelWidthMismatch {
        /// Width stored in database metadata.
        expected: u32,
        /// Width requested in the config.
        got: u32,
    },

    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// Content exceeds maximum allowed size.
    #[error("Content too large: {size} bytes (max: {max} bytes)")]
    ContentTooLarge {
        /// Actual content size in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },

    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },
}

impl ValidationError {
    /// Creates a level width mismatch error.
    pub fn level_width_mismatch(expected: u32, got: u32) -> Self {
        Self::LevelWidthMismatch { expected, got }
    }

    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a content too large error.
    pub fn content_too_large(size: usize, max: usize) -> Self {
        Self::ContentTooLarge { size, max }
    }

    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }
}

/// Not found errors for specific entity types.
///
/// A mission or session owned by a different user is also reported as
/// not found; ownership is part of the lookup key, and the engine never
/// reveals whether a foreign record exists.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// User progress record with given ID not found.
    #[error("User not found: {0}")]
    User(String),

    /// Mission with given ID not found (or not owned by the caller).
    #[error("Mission not found: {0}")]
    Mission(String),

    /// Session with given ID not found (or not owned by the caller).
    #[error("Session not found: {0}")]
    Session(String),
}

impl NotFoundError {
    /// Creates a user not found error.
    pub fn user(id: impl ToString) -> Self {
        Self::User(id.to_string())
    }

    /// Creates a mission not found error.
    pub fn mission(id: impl ToString) -> Self {
        Self::Mission(id.to_string())
    }

    /// Creates a session not found error.
    pub fn session(id: impl ToString) -> Self {
        Self::Session(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QuestlineError::config("Invalid level width");
        assert_eq!(err.to_string(), "Configuration error: Invalid level width");
    }

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::SchemaVersionMismatch {
            expected: 2,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "Schema version mismatch: expected 2, found 1"
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::level_width_mismatch(100, 250);
        assert_eq!(err.to_string(), "Level width mismatch: expected 100, got 250");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = NotFoundError::user("abc-123");
        assert_eq!(err.to_string(), "User not found: abc-123");
    }

    #[test]
    fn test_is_not_found() {
        let err: QuestlineError = NotFoundError::mission("test").into();
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_is_validation() {
        let err: QuestlineError = ValidationError::required_field("text").into();
        assert!(err.is_validation());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_error_conversion_chain() {
        // Simulate a storage error propagating up
        fn inner() -> Result<()> {
            Err(StorageError::corrupted("test corruption"))?
        }

        let result = inner();
        assert!(result.is_err());
        assert!(result.unwrap_err().is_storage());
    }
}
