//! Error taxonomy shared by repositories and services.
//!
//! # Invariants
//! - SQLite busy/locked/IO failures and pool timeouts classify as
//!   `Transient`; callers may retry the whole operation.
//! - SQLite constraint failures classify as `ConstraintViolation`.

use crate::db::DbError;
use crate::model::award::LedgerOverflow;
use crate::model::tournament::TournamentValidationError;
use crate::model::EntityRef;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure of a store read or write.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced row does not exist.
    NotFound(EntityRef),
    /// Write would break a foreign key or a ledger invariant.
    ConstraintViolation(String),
    /// Connectivity, timeout or lock contention; safe to retry.
    Transient(DbError),
    /// Caller supplied a value outside the accepted domain.
    MalformedInput(String),
    /// Persisted row cannot be converted to a valid record.
    InvalidData(String),
    /// Connection schema is not the one this binary migrates to.
    SchemaMismatch(String),
    /// Any other storage failure.
    Db(DbError),
}

impl StoreError {
    /// Returns whether retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Stable snake_case code for log lines and front ends.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::ConstraintViolation(_) => "constraint_violation",
            Self::Transient(_) => "transient_store_error",
            Self::MalformedInput(_) => "malformed_input",
            Self::InvalidData(_) => "invalid_data",
            Self::SchemaMismatch(_) => "schema_mismatch",
            Self::Db(_) => "store_error",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::ConstraintViolation(message) => write!(f, "constraint violation: {message}"),
            Self::Transient(err) => write!(f, "transient store error: {err}"),
            Self::MalformedInput(message) => write!(f, "malformed input: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::SchemaMismatch(message) => write!(f, "schema mismatch: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transient(err) | Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::ConstraintViolation(_)
            | Self::MalformedInput(_)
            | Self::InvalidData(_)
            | Self::SchemaMismatch(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        if value.is_transient() {
            Self::Transient(value)
        } else if value.is_constraint_violation() {
            Self::ConstraintViolation(value.to_string())
        } else {
            Self::Db(value)
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

impl From<LedgerOverflow> for StoreError {
    fn from(value: LedgerOverflow) -> Self {
        Self::InvalidData(value.to_string())
    }
}

impl From<TournamentValidationError> for StoreError {
    fn from(value: TournamentValidationError) -> Self {
        Self::MalformedInput(value.to_string())
    }
}
