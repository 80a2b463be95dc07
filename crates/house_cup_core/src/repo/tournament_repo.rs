//! Tournament repository contract and SQLite implementation.
//!
//! # Invariants
//! - Write paths call `Tournament::validate()` rules before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::model::tournament::{Tournament, TournamentId};
use crate::repo::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, Row};

const TOURNAMENT_SELECT_SQL: &str = "SELECT
    id,
    tournament_name,
    created_at,
    ended_at
FROM tournaments";

/// Repository interface for tournament rows.
pub trait TournamentRepository {
    /// Inserts a tournament; `created_at = None` stamps the current time.
    fn create_tournament(&self, name: &str, created_at: Option<i64>) -> StoreResult<Tournament>;
    fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;
    /// Lists every tournament by id.
    fn list_tournaments(&self) -> StoreResult<Vec<Tournament>>;
    /// Returns `false` when no row matched.
    fn rename_tournament(&self, id: TournamentId, name: &str) -> StoreResult<bool>;
    /// Returns `false` when no row matched.
    fn set_ended_at(&self, id: TournamentId, ended_at: Option<i64>) -> StoreResult<bool>;
}

/// SQLite-backed tournament repository.
pub struct SqliteTournamentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTournamentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TournamentRepository for SqliteTournamentRepository<'_> {
    fn create_tournament(&self, name: &str, created_at: Option<i64>) -> StoreResult<Tournament> {
        self.conn.execute(
            "INSERT INTO tournaments (tournament_name, created_at, ended_at)
             VALUES (?1, COALESCE(?2, strftime('%s', 'now') * 1000), NULL);",
            params![name, created_at],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_tournament(id)?.ok_or_else(|| {
            StoreError::InvalidData(format!("tournament {id} vanished after insert"))
        })
    }

    fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TOURNAMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_tournament_row(row)?));
        }
        Ok(None)
    }

    fn list_tournaments(&self) -> StoreResult<Vec<Tournament>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TOURNAMENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tournaments = Vec::new();
        while let Some(row) = rows.next()? {
            tournaments.push(parse_tournament_row(row)?);
        }
        Ok(tournaments)
    }

    fn rename_tournament(&self, id: TournamentId, name: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE tournaments SET tournament_name = ?2 WHERE id = ?1;",
            params![id, name],
        )?;
        Ok(changed > 0)
    }

    fn set_ended_at(&self, id: TournamentId, ended_at: Option<i64>) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE tournaments SET ended_at = ?2 WHERE id = ?1;",
            params![id, ended_at],
        )?;
        Ok(changed > 0)
    }
}

fn parse_tournament_row(row: &Row<'_>) -> StoreResult<Tournament> {
    let tournament = Tournament {
        id: row.get("id")?,
        name: row.get("tournament_name")?,
        created_at: row.get("created_at")?,
        ended_at: row.get("ended_at")?,
    };
    tournament.validate().map_err(|err| {
        StoreError::InvalidData(format!("tournament {}: {err}", tournament.id))
    })?;
    Ok(tournament)
}
