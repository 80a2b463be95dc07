//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define entity-oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories borrow a connection (or an open transaction) and never
//!   begin or commit transactions themselves.
//! - Repository APIs return `Ok(None)` / `Ok(false)` for absent rows; the
//!   service layer decides whether that is `NotFound`.

pub mod award_repo;
pub mod error;
pub mod house_repo;
pub mod student_repo;
pub mod tournament_repo;

use crate::db::migrations::latest_version;
use error::{StoreError, StoreResult};
use rusqlite::Connection;

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "tournaments",
        &["id", "tournament_name", "created_at", "ended_at"],
    ),
    (
        "houses",
        &["id", "house_name", "house_points", "tournament_id"],
    ),
    ("students", &["id", "student_name", "points", "house_id"]),
    (
        "point_awards",
        &["id", "points", "notes", "student_id", "house_id", "created_at"],
    ),
];

/// Verifies that `conn` is migrated to the schema this binary expects.
///
/// Services call this once on construction so per-call repositories can be
/// built without re-checking.
pub fn ensure_schema_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::SchemaMismatch(format!(
            "store requires schema version {expected_version}, got {actual_version}"
        )));
    }

    for (table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(StoreError::SchemaMismatch(format!(
                "store requires table `{table}`"
            )));
        }
        for column in *columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::SchemaMismatch(format!(
                    "store requires column `{column}` in table `{table}`"
                )));
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
