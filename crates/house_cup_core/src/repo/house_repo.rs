//! House repository contract and SQLite implementation.
//!
//! # Invariants
//! - New houses start with `house_points = 0`.
//! - `add_house_points` is a single-statement increment, so two concurrent
//!   writers never lose an update.
//! - Listings are deterministic (`id ASC`, or points then id for standings).

use crate::model::house::{House, HouseId};
use crate::model::tournament::TournamentId;
use crate::repo::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, Row};

const HOUSE_SELECT_SQL: &str = "SELECT
    id,
    house_name,
    house_points,
    tournament_id
FROM houses";

/// Repository interface for house rows.
pub trait HouseRepository {
    fn create_house(&self, tournament_id: TournamentId, name: &str) -> StoreResult<House>;
    fn get_house(&self, id: HouseId) -> StoreResult<Option<House>>;
    fn list_houses(&self) -> StoreResult<Vec<House>>;
    fn list_houses_for_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<House>>;
    /// Houses of one tournament ordered by running total, highest first.
    fn house_standings(&self, tournament_id: TournamentId) -> StoreResult<Vec<House>>;
    /// Returns `false` when no row matched.
    fn rename_house(&self, id: HouseId, name: &str) -> StoreResult<bool>;
    /// Adds a signed delta to the running total. Returns `false` when no row
    /// matched.
    fn add_house_points(&self, id: HouseId, delta: i64) -> StoreResult<bool>;
}

/// SQLite-backed house repository.
pub struct SqliteHouseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHouseRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_houses(&self, sql: &str, tournament_id: Option<TournamentId>) -> StoreResult<Vec<House>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match tournament_id {
            Some(tournament_id) => stmt.query([tournament_id])?,
            None => stmt.query([])?,
        };
        let mut houses = Vec::new();
        while let Some(row) = rows.next()? {
            houses.push(parse_house_row(row)?);
        }
        Ok(houses)
    }
}

impl HouseRepository for SqliteHouseRepository<'_> {
    fn create_house(&self, tournament_id: TournamentId, name: &str) -> StoreResult<House> {
        self.conn.execute(
            "INSERT INTO houses (house_name, house_points, tournament_id)
             VALUES (?1, 0, ?2);",
            params![name, tournament_id],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_house(id)?
            .ok_or_else(|| StoreError::InvalidData(format!("house {id} vanished after insert")))
    }

    fn get_house(&self, id: HouseId) -> StoreResult<Option<House>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{HOUSE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_house_row(row)?));
        }
        Ok(None)
    }

    fn list_houses(&self) -> StoreResult<Vec<House>> {
        self.query_houses(&format!("{HOUSE_SELECT_SQL} ORDER BY id ASC;"), None)
    }

    fn list_houses_for_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<House>> {
        self.query_houses(
            &format!("{HOUSE_SELECT_SQL} WHERE tournament_id = ?1 ORDER BY id ASC;"),
            Some(tournament_id),
        )
    }

    fn house_standings(&self, tournament_id: TournamentId) -> StoreResult<Vec<House>> {
        self.query_houses(
            &format!(
                "{HOUSE_SELECT_SQL}
                 WHERE tournament_id = ?1
                 ORDER BY house_points DESC, id ASC;"
            ),
            Some(tournament_id),
        )
    }

    fn rename_house(&self, id: HouseId, name: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE houses SET house_name = ?2 WHERE id = ?1;",
            params![id, name],
        )?;
        Ok(changed > 0)
    }

    fn add_house_points(&self, id: HouseId, delta: i64) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE houses SET house_points = house_points + ?2 WHERE id = ?1;",
            params![id, delta],
        )?;
        Ok(changed > 0)
    }
}

fn parse_house_row(row: &Row<'_>) -> StoreResult<House> {
    Ok(House {
        id: row.get("id")?,
        name: row.get("house_name")?,
        house_points: row.get("house_points")?,
        tournament_id: row.get("tournament_id")?,
    })
}
