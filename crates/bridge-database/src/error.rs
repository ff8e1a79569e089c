//! Database error types.

use thiserror::Error;

/// Database error type.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Blocking task error
    #[error("Task error: {0}")]
    Task(String),

    /// The Messages database exists but macOS denied access to it.
    #[error(
        "cannot access the Messages database at {path}\n\n\
         The Messages database requires Full Disk Access permission.\n\n\
         To fix:\n\
         1. Open System Settings → Privacy & Security → Full Disk Access\n\
         2. Add your terminal application (Terminal.app, iTerm, etc.)\n\
         3. Restart your terminal and try again"
    )]
    PermissionDenied {
        /// Path that could not be opened.
        path: String,
    },
}

/// Result type alias using DatabaseError.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
