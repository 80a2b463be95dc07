//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own transaction scope: one pooled connection and at most one
//!   transaction per call.
//! - Keep front ends decoupled from storage details.
//!
//! # Invariants
//! - Running totals change only through `AwardService`.
//! - Every failed write drops its transaction uncommitted before the error
//!   is returned.

pub mod award_service;
pub mod query_service;
pub mod roster_service;

use crate::db::ConnectionPool;
use crate::model::{normalize_name, EntityRef};
use crate::repo::ensure_schema_ready;
use crate::repo::error::{StoreError, StoreResult};
use log::{error, info, warn};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

fn check_pool_schema(pool: &ConnectionPool) -> StoreResult<()> {
    let conn = pool.get()?;
    ensure_schema_ready(&conn)
}

fn require_positive_id(entity: EntityRef) -> StoreResult<()> {
    if entity.id() <= 0 {
        return Err(StoreError::MalformedInput(format!(
            "{entity} is not a valid id; ids are positive"
        )));
    }
    Ok(())
}

fn require_name(value: &str, field: &'static str) -> StoreResult<String> {
    normalize_name(value)
        .ok_or_else(|| StoreError::MalformedInput(format!("{field} must not be blank")))
}

fn current_epoch_ms() -> StoreResult<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| StoreError::MalformedInput(format!("system clock before epoch: {err}")))?;
    i64::try_from(elapsed.as_millis())
        .map_err(|_| StoreError::MalformedInput("system clock out of range".to_string()))
}

/// Runs one service operation and emits `start`/`ok`/`error` events.
///
/// Expected caller-side failures (not found, bad input, constraint) log at
/// `warn`; storage failures log at `error`.
fn logged<T>(
    event: &'static str,
    module: &'static str,
    fields: &str,
    operation: impl FnOnce() -> StoreResult<T>,
) -> StoreResult<T> {
    let started_at = Instant::now();
    info!("event={event} module={module} status=start {fields}");
    let result = operation();
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event={event} module={module} status=ok {fields} duration_ms={duration_ms}"),
        Err(
            err @ (StoreError::NotFound(_)
            | StoreError::MalformedInput(_)
            | StoreError::ConstraintViolation(_)),
        ) => warn!(
            "event={event} module={module} status=rejected {fields} duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
        Err(err) => error!(
            "event={event} module={module} status=error {fields} duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{require_name, require_positive_id};
    use crate::model::EntityRef;
    use crate::repo::error::StoreError;

    #[test]
    fn non_positive_ids_are_malformed() {
        for id in [0, -7] {
            let err = require_positive_id(EntityRef::House(id)).unwrap_err();
            assert!(matches!(err, StoreError::MalformedInput(_)));
        }
        assert!(require_positive_id(EntityRef::House(1)).is_ok());
    }

    #[test]
    fn blank_names_are_malformed() {
        assert!(matches!(
            require_name("   ", "house name"),
            Err(StoreError::MalformedInput(_))
        ));
        assert_eq!(require_name(" Ravenclaw ", "house name").unwrap(), "Ravenclaw");
    }
}
