//! Read-side aggregation queries.
//!
//! # Responsibility
//! - Answer running-total questions straight from the denormalized columns.
//! - Expose the award ledger for audit, and an audit that recomputes it.
//!
//! # Invariants
//! - Never writes; totals are trusted as maintained by `AwardService`.
//! - Multi-statement reads run in one deferred transaction, so the parent
//!   existence check, the rows and any total come from one snapshot.
//! - Reads scoped to a parent row return `NotFound` when the parent is absent.

use super::{check_pool_schema, logged, require_positive_id};
use crate::db::ConnectionPool;
use crate::model::award::{AwardLedger, PointAward};
use crate::model::house::{House, HouseId};
use crate::model::student::{Student, StudentId};
use crate::model::tournament::TournamentId;
use crate::model::{EntityRef, TotalDrift};
use crate::repo::award_repo::{AwardRepository, SqliteAwardRepository};
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::house_repo::{HouseRepository, SqliteHouseRepository};
use crate::repo::student_repo::{SqliteStudentRepository, StudentRepository};
use crate::repo::tournament_repo::{SqliteTournamentRepository, TournamentRepository};
use rusqlite::Connection;
use std::sync::Arc;

/// Read-only query facade.
pub struct QueryService {
    pool: Arc<ConnectionPool>,
}

impl QueryService {
    pub fn try_new(pool: Arc<ConnectionPool>) -> StoreResult<Self> {
        check_pool_schema(&pool)?;
        Ok(Self { pool })
    }

    /// Running total of one student.
    pub fn student_total(&self, student_id: StudentId) -> StoreResult<i64> {
        require_positive_id(EntityRef::Student(student_id))?;
        let conn = self.pool.get()?;
        let student = require_student(&conn, student_id)?;
        Ok(student.points)
    }

    /// Running total of one house.
    pub fn house_total(&self, house_id: HouseId) -> StoreResult<i64> {
        require_positive_id(EntityRef::House(house_id))?;
        let conn = self.pool.get()?;
        let house = require_house(&conn, house_id)?;
        Ok(house.house_points)
    }

    /// Every award in insertion order.
    pub fn list_awards(&self) -> StoreResult<Vec<PointAward>> {
        let conn = self.pool.get()?;
        SqliteAwardRepository::new(&conn).list_awards()
    }

    /// Awards booked to one student, in insertion order.
    pub fn list_awards_for_student(&self, student_id: StudentId) -> StoreResult<Vec<PointAward>> {
        require_positive_id(EntityRef::Student(student_id))?;
        self.snapshot(|conn| {
            require_student(conn, student_id)?;
            SqliteAwardRepository::new(conn).list_awards_for_student(student_id)
        })
    }

    /// Awards booked to one house, in insertion order, including house-only
    /// awards.
    pub fn list_awards_for_house(&self, house_id: HouseId) -> StoreResult<Vec<PointAward>> {
        require_positive_id(EntityRef::House(house_id))?;
        self.snapshot(|conn| {
            require_house(conn, house_id)?;
            SqliteAwardRepository::new(conn).list_awards_for_house(house_id)
        })
    }

    /// Awards of one student together with their sum.
    ///
    /// # Errors
    /// - `InvalidData` when the ledger sum does not fit in `i64`.
    pub fn student_ledger(&self, student_id: StudentId) -> StoreResult<AwardLedger> {
        require_positive_id(EntityRef::Student(student_id))?;
        self.snapshot(|conn| {
            require_student(conn, student_id)?;
            let awards = SqliteAwardRepository::new(conn).list_awards_for_student(student_id)?;
            Ok(AwardLedger::from_awards(awards)?)
        })
    }

    /// Awards of one house together with their sum.
    ///
    /// # Errors
    /// - `InvalidData` when the ledger sum does not fit in `i64`.
    pub fn house_ledger(&self, house_id: HouseId) -> StoreResult<AwardLedger> {
        require_positive_id(EntityRef::House(house_id))?;
        self.snapshot(|conn| {
            require_house(conn, house_id)?;
            let awards = SqliteAwardRepository::new(conn).list_awards_for_house(house_id)?;
            Ok(AwardLedger::from_awards(awards)?)
        })
    }

    pub fn list_houses_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<House>> {
        require_positive_id(EntityRef::Tournament(tournament_id))?;
        self.snapshot(|conn| {
            require_tournament(conn, tournament_id)?;
            SqliteHouseRepository::new(conn).list_houses_for_tournament(tournament_id)
        })
    }

    /// Houses of one tournament, highest running total first; ties keep
    /// creation order.
    pub fn house_standings(&self, tournament_id: TournamentId) -> StoreResult<Vec<House>> {
        require_positive_id(EntityRef::Tournament(tournament_id))?;
        self.snapshot(|conn| {
            require_tournament(conn, tournament_id)?;
            SqliteHouseRepository::new(conn).house_standings(tournament_id)
        })
    }

    pub fn list_students_for_house(&self, house_id: HouseId) -> StoreResult<Vec<Student>> {
        require_positive_id(EntityRef::House(house_id))?;
        self.snapshot(|conn| {
            require_house(conn, house_id)?;
            SqliteStudentRepository::new(conn).list_students_for_house(house_id)
        })
    }

    pub fn list_students_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Student>> {
        require_positive_id(EntityRef::Tournament(tournament_id))?;
        self.snapshot(|conn| {
            require_tournament(conn, tournament_id)?;
            SqliteStudentRepository::new(conn).list_students_for_tournament(tournament_id)
        })
    }

    /// Recomputes every running total from the ledger and reports the rows
    /// that disagree. An empty result means the store is consistent.
    pub fn audit_totals(&self) -> StoreResult<Vec<TotalDrift>> {
        logged("audit_totals", "query", "", || {
            self.snapshot(|conn| SqliteAwardRepository::new(conn).total_drifts())
        })
    }

    fn snapshot<T>(&self, read: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let value = read(&*tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn require_tournament(conn: &Connection, tournament_id: TournamentId) -> StoreResult<()> {
    SqliteTournamentRepository::new(conn)
        .get_tournament(tournament_id)?
        .map(|_| ())
        .ok_or(StoreError::NotFound(EntityRef::Tournament(tournament_id)))
}

fn require_house(conn: &Connection, house_id: HouseId) -> StoreResult<House> {
    SqliteHouseRepository::new(conn)
        .get_house(house_id)?
        .ok_or(StoreError::NotFound(EntityRef::House(house_id)))
}

fn require_student(conn: &Connection, student_id: StudentId) -> StoreResult<Student> {
    SqliteStudentRepository::new(conn)
        .get_student(student_id)?
        .ok_or(StoreError::NotFound(EntityRef::Student(student_id)))
}
