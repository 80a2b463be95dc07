//! SQLite storage bootstrap, pooling and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the house cup store.
//! - Apply schema migrations in deterministic order.
//! - Hand out process-wide pooled connections to services.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - Every connection handed out has `foreign_keys=ON`.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod pool;

pub use open::{open_db, open_db_in_memory, open_db_with_timeout};
pub use pool::{ConnectionPool, PoolOptions, PooledConnection};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// No pooled connection became free within the checkout timeout.
    PoolTimeout { waited_ms: u128 },
    /// Pool sizing or timeout values are out of range.
    InvalidPoolOptions(String),
    /// Pool could not establish its connections.
    Pool(r2d2::Error),
}

impl DbError {
    /// Returns whether the failure is connectivity/lock related and the whole
    /// operation may be retried from scratch.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(err) => matches!(
                err.sqlite_error_code(),
                Some(
                    ErrorCode::DatabaseBusy
                        | ErrorCode::DatabaseLocked
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::CannotOpen
                        | ErrorCode::OperationInterrupted
                )
            ),
            Self::PoolTimeout { .. } => true,
            Self::UnsupportedSchemaVersion { .. }
            | Self::InvalidPoolOptions(_)
            | Self::Pool(_) => false,
        }
    }

    /// Returns whether SQLite rejected the write on a constraint
    /// (foreign key, not-null, trigger abort).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Sqlite(err) => err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation),
            _ => false,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::PoolTimeout { waited_ms } => {
                write!(f, "no pooled connection available after {waited_ms}ms")
            }
            Self::InvalidPoolOptions(message) => write!(f, "invalid pool options: {message}"),
            Self::Pool(err) => write!(f, "connection pool failed to start: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Pool(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::PoolTimeout { .. }
            | Self::InvalidPoolOptions(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
