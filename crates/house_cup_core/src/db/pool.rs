//! Process-wide SQLite connection pool.
//!
//! # Responsibility
//! - Build an `r2d2` pool whose every connection is configured and migrated.
//! - Lend one connection per unit of work.
//!
//! # Invariants
//! - Every lent connection has `foreign_keys=ON`, the configured busy
//!   timeout and the latest schema.
//! - In-memory pools hold exactly one connection that is never recycled
//!   (each in-memory connection is a separate database).
//! - Services open transactions through rusqlite `Transaction` guards, which
//!   roll back on drop, so connections go back to the pool in autocommit.

use super::migrations::apply_migrations;
use super::open::{configure_connection, open_db_with_timeout};
use super::{DbError, DbResult};
use log::{info, warn};
use r2d2::CustomizeConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{ffi, Connection};
use std::path::Path;
use std::time::{Duration, Instant};

/// Connection lent by [`ConnectionPool::get`]; returned to the pool on drop.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Sizing and wait budgets for [`ConnectionPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Number of connections kept by the pool.
    pub size: usize,
    /// SQLite lock wait budget per statement.
    pub busy_timeout: Duration,
    /// Maximum wait for a free pooled connection.
    pub checkout_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: 4,
            busy_timeout: Duration::from_secs(5),
            checkout_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolOptions {
    fn validate(&self) -> DbResult<u32> {
        if self.checkout_timeout.is_zero() {
            return Err(DbError::InvalidPoolOptions(
                "checkout timeout must be positive".to_string(),
            ));
        }
        match u32::try_from(self.size) {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(DbError::InvalidPoolOptions(format!(
                "pool size must be between 1 and {}, got {}",
                u32::MAX,
                self.size
            ))),
        }
    }
}

/// Brings freshly opened pool connections to the latest schema.
#[derive(Debug)]
struct MigrateOnAcquire;

impl CustomizeConnection<Connection, rusqlite::Error> for MigrateOnAcquire {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        apply_migrations(conn).map_err(|err| match err {
            DbError::Sqlite(err) => err,
            other => rusqlite::Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_SCHEMA),
                Some(other.to_string()),
            ),
        })
    }
}

/// Shared pool of migrated SQLite connections.
pub struct ConnectionPool {
    inner: r2d2::Pool<SqliteConnectionManager>,
    checkout_timeout: Duration,
}

impl ConnectionPool {
    /// Opens a pool over the database file at `path`.
    ///
    /// The file is bootstrapped once before the pool starts, so schema
    /// errors surface as typed [`DbError`]s.
    pub fn open(path: impl AsRef<Path>, options: PoolOptions) -> DbResult<Self> {
        let size = options.validate()?;
        let path = path.as_ref();
        drop(open_db_with_timeout(path, options.busy_timeout)?);

        let busy_timeout = options.busy_timeout;
        let manager = SqliteConnectionManager::file(path)
            .with_init(move |conn| configure_connection(conn, true, busy_timeout));
        let inner = r2d2::Pool::builder()
            .max_size(size)
            .connection_timeout(options.checkout_timeout)
            .connection_customizer(Box::new(MigrateOnAcquire))
            .build(manager)
            .map_err(DbError::Pool)?;

        info!("event=pool_open module=db status=ok mode=file size={size}");
        Ok(Self {
            inner,
            checkout_timeout: options.checkout_timeout,
        })
    }

    /// Opens a single-connection pool over a fresh in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        Self::in_memory_with_timeout(PoolOptions::default().checkout_timeout)
    }

    /// Same as [`ConnectionPool::in_memory`] with an explicit checkout wait.
    pub fn in_memory_with_timeout(checkout_timeout: Duration) -> DbResult<Self> {
        let options = PoolOptions {
            size: 1,
            checkout_timeout,
            ..PoolOptions::default()
        };
        options.validate()?;

        let busy_timeout = options.busy_timeout;
        let manager = SqliteConnectionManager::memory()
            .with_init(move |conn| configure_connection(conn, false, busy_timeout));
        let inner = r2d2::Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_timeout(checkout_timeout)
            .connection_customizer(Box::new(MigrateOnAcquire))
            .build(manager)
            .map_err(DbError::Pool)?;

        info!("event=pool_open module=db status=ok mode=memory size=1");
        Ok(Self {
            inner,
            checkout_timeout,
        })
    }

    /// Maximum number of connections owned by the pool.
    pub fn size(&self) -> usize {
        self.inner.max_size() as usize
    }

    /// Borrows one connection, blocking up to the checkout timeout.
    ///
    /// # Errors
    /// - `DbError::PoolTimeout` when no connection becomes available within
    ///   the checkout timeout.
    pub fn get(&self) -> DbResult<PooledConnection> {
        let started_at = Instant::now();
        self.inner.get_timeout(self.checkout_timeout).map_err(|err| {
            let waited_ms = started_at.elapsed().as_millis();
            warn!(
                "event=pool_checkout module=db status=error error_code=pool_timeout waited_ms={} error={}",
                waited_ms, err
            );
            DbError::PoolTimeout { waited_ms }
        })
    }
}
