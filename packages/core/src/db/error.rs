//! Database Error Types
//!
//! Everything the libsql layer can fail with, including the two conflict
//! classes (constraint violation, busy database) the retry loop acts on.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection, initialization and statement failures. Constraint
/// violations and lock timeouts get their own variants because the service
/// layer treats them as retryable conflicts rather than hard failures.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A UNIQUE / FOREIGN KEY constraint rejected the write
    #[error("Constraint violation: {context}")]
    ConstraintViolation { context: String },

    /// The database stayed locked past the busy timeout
    #[error("Database busy: {context}")]
    Busy { context: String },

    /// Stored row could not be converted into a model
    #[error("Invalid row data: {0}")]
    InvalidRow(String),
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create an invalid row error
    pub fn invalid_row(msg: impl Into<String>) -> Self {
        Self::InvalidRow(msg.into())
    }

    /// Classify a libsql error raised while running `what`
    ///
    /// SQLite reports constraint and lock failures through the message text,
    /// which is stable across libsql releases.
    pub fn from_libsql(what: &str, err: libsql::Error) -> Self {
        let message = err.to_string();
        let context = format!("{}: {}", what, message);

        if message.contains("constraint failed") {
            Self::ConstraintViolation { context }
        } else if message.contains("database is locked") || message.contains("SQLITE_BUSY") {
            Self::Busy { context }
        } else {
            Self::SqlExecutionError { context }
        }
    }

    /// Whether retrying the whole transaction may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. } | Self::Busy { .. })
    }
}
