//! Read-only connection pool for the Messages database.
//!
//! Messages.app keeps appending rows while the bridge runs, so the file
//! must not be opened immutable; a busy timeout rides out its write locks
//! instead. Every connection in the pool is read-only.

use crate::{DatabaseError, DatabaseResult};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Configuration for the database pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum connections in the pool.
    pub max_size: u32,
    /// Minimum idle connections to maintain.
    pub min_idle: Option<u32>,
    /// Connection acquisition timeout.
    pub connection_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

/// Thread-safe read-only connection pool.
pub struct DatabasePool {
    pool: Pool<SqliteConnectionManager>,
    path: String,
}

impl DatabasePool {
    /// Opens the database read-only with a 5-second busy timeout.
    ///
    /// Permission problems surface here, before the RPC loop starts, as
    /// [`DatabaseError::PermissionDenied`].
    pub fn open_read_only(path: &Path, config: PoolConfig) -> DatabaseResult<Self> {
        let path_str = path.to_string_lossy().to_string();

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_NO_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;

        // Probe one direct connection first. The pool retries failed
        // connections until its timeout, which would sit on a permission
        // error for seconds; this surfaces it immediately and classified.
        {
            let probe = rusqlite::Connection::open_with_flags(path, flags)
                .map_err(|e| classify_open_error(&e.to_string(), &path_str))?;
            probe
                .query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| classify_open_error(&e.to_string(), &path_str))?;
        }

        let manager = SqliteConnectionManager::file(path)
            .with_flags(flags)
            .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));

        let pool = {
            let path_str = path_str.clone();
            Pool::builder()
                .max_size(config.max_size)
                .min_idle(config.min_idle)
                .connection_timeout(config.connection_timeout)
                .build(manager)
                .map_err(|e| classify_open_error(&e.to_string(), &path_str))?
        };

        info!(
            path = %path_str,
            max_size = config.max_size,
            "Messages database pool created"
        );

        Ok(Self {
            pool,
            path: path_str,
        })
    }

    /// Get a connection from the pool.
    ///
    /// Blocks until a connection is available or the timeout is reached.
    pub fn get(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// SQLITE_CANTOPEN and sandbox denials all mean the same thing for chat.db:
/// the process lacks Full Disk Access.
fn classify_open_error(message: &str, path: &str) -> DatabaseError {
    let lowered = message.to_lowercase();
    if lowered.contains("unable to open database")
        || lowered.contains("authorization denied")
        || lowered.contains("access permission")
        || lowered.contains("out of memory (14)")
    {
        DatabaseError::PermissionDenied {
            path: path.to_string(),
        }
    } else {
        DatabaseError::Connection(message.to_string())
    }
}
