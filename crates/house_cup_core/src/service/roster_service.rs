//! Tournament, house and student management.
//!
//! # Responsibility
//! - Create, rename and list the entities awards are booked against.
//! - Enforce parent existence inside the writing transaction.
//!
//! # Invariants
//! - New houses and students start with a zero running total.
//! - Roster operations never touch running totals; `AwardService` owns them.
//! - Bulk enrolment is all-or-nothing.

use super::{check_pool_schema, current_epoch_ms, logged, require_name, require_positive_id};
use crate::db::ConnectionPool;
use crate::model::house::{House, HouseId};
use crate::model::student::{NewStudent, Student, StudentId};
use crate::model::tournament::{Tournament, TournamentId};
use crate::model::EntityRef;
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::house_repo::{HouseRepository, SqliteHouseRepository};
use crate::repo::student_repo::{SqliteStudentRepository, StudentRepository};
use crate::repo::tournament_repo::{SqliteTournamentRepository, TournamentRepository};
use rusqlite::{Connection, TransactionBehavior};
use std::sync::Arc;

/// Roster management facade.
pub struct RosterService {
    pool: Arc<ConnectionPool>,
}

impl RosterService {
    pub fn try_new(pool: Arc<ConnectionPool>) -> StoreResult<Self> {
        check_pool_schema(&pool)?;
        Ok(Self { pool })
    }

    /// Starts a tournament. `created_at = None` stamps the current time.
    pub fn create_tournament(
        &self,
        name: &str,
        created_at: Option<i64>,
    ) -> StoreResult<Tournament> {
        let name = require_name(name, "tournament name")?;
        logged("create_tournament", "roster", "", || {
            let conn = self.pool.get()?;
            SqliteTournamentRepository::new(&conn).create_tournament(&name, created_at)
        })
    }

    pub fn get_tournament(&self, id: TournamentId) -> StoreResult<Tournament> {
        require_positive_id(EntityRef::Tournament(id))?;
        let conn = self.pool.get()?;
        load_tournament(&conn, id)
    }

    pub fn list_tournaments(&self) -> StoreResult<Vec<Tournament>> {
        let conn = self.pool.get()?;
        SqliteTournamentRepository::new(&conn).list_tournaments()
    }

    pub fn rename_tournament(&self, id: TournamentId, name: &str) -> StoreResult<Tournament> {
        require_positive_id(EntityRef::Tournament(id))?;
        let name = require_name(name, "tournament name")?;
        let fields = format!("tournament_id={id}");
        logged("rename_tournament", "roster", &fields, || {
            self.write(|conn| {
                let repo = SqliteTournamentRepository::new(conn);
                if !repo.rename_tournament(id, &name)? {
                    return Err(StoreError::NotFound(EntityRef::Tournament(id)));
                }
                load_tournament(conn, id)
            })
        })
    }

    /// Closes a tournament. `ended_at = None` stamps the current time.
    ///
    /// # Errors
    /// - `MalformedInput` when `ended_at` precedes the tournament's
    ///   `created_at`.
    pub fn end_tournament(&self, id: TournamentId, ended_at: Option<i64>) -> StoreResult<Tournament> {
        require_positive_id(EntityRef::Tournament(id))?;
        let ended_at = match ended_at {
            Some(value) => value,
            None => current_epoch_ms()?,
        };
        let fields = format!("tournament_id={id} ended_at={ended_at}");
        logged("end_tournament", "roster", &fields, || {
            self.write(|conn| {
                let mut tournament = load_tournament(conn, id)?;
                tournament.ended_at = Some(ended_at);
                tournament.validate()?;
                SqliteTournamentRepository::new(conn).set_ended_at(id, Some(ended_at))?;
                Ok(tournament)
            })
        })
    }

    /// Adds a house with a zero total to an existing tournament.
    ///
    /// # Errors
    /// - `ConstraintViolation` when the tournament does not exist.
    pub fn create_house(&self, tournament_id: TournamentId, name: &str) -> StoreResult<House> {
        require_positive_id(EntityRef::Tournament(tournament_id))?;
        let name = require_name(name, "house name")?;
        let fields = format!("tournament_id={tournament_id}");
        logged("create_house", "roster", &fields, || {
            self.write(|conn| {
                let tournaments = SqliteTournamentRepository::new(conn);
                if tournaments.get_tournament(tournament_id)?.is_none() {
                    return Err(StoreError::ConstraintViolation(format!(
                        "house references missing tournament {tournament_id}"
                    )));
                }
                SqliteHouseRepository::new(conn).create_house(tournament_id, &name)
            })
        })
    }

    pub fn get_house(&self, id: HouseId) -> StoreResult<House> {
        require_positive_id(EntityRef::House(id))?;
        let conn = self.pool.get()?;
        load_house(&conn, id)
    }

    pub fn list_houses(&self) -> StoreResult<Vec<House>> {
        let conn = self.pool.get()?;
        SqliteHouseRepository::new(&conn).list_houses()
    }

    pub fn rename_house(&self, id: HouseId, name: &str) -> StoreResult<House> {
        require_positive_id(EntityRef::House(id))?;
        let name = require_name(name, "house name")?;
        let fields = format!("house_id={id}");
        logged("rename_house", "roster", &fields, || {
            self.write(|conn| {
                if !SqliteHouseRepository::new(conn).rename_house(id, &name)? {
                    return Err(StoreError::NotFound(EntityRef::House(id)));
                }
                load_house(conn, id)
            })
        })
    }

    /// Enrols one student with a zero total.
    ///
    /// # Errors
    /// - `ConstraintViolation` when the house does not exist.
    pub fn create_student(&self, house_id: HouseId, name: &str) -> StoreResult<Student> {
        let enrolment = NewStudent {
            name: name.to_string(),
            house_id,
        };
        let mut created = self.create_students(std::slice::from_ref(&enrolment))?;
        created
            .pop()
            .ok_or_else(|| StoreError::InvalidData("student insert returned no row".to_string()))
    }

    /// Enrols several students in one transaction; one bad entry rejects all.
    pub fn create_students(&self, enrolments: &[NewStudent]) -> StoreResult<Vec<Student>> {
        let mut normalized = Vec::with_capacity(enrolments.len());
        for enrolment in enrolments {
            require_positive_id(EntityRef::House(enrolment.house_id))?;
            normalized.push((enrolment.house_id, require_name(&enrolment.name, "student name")?));
        }

        let fields = format!("count={}", normalized.len());
        logged("create_students", "roster", &fields, || {
            self.write(|conn| {
                let houses = SqliteHouseRepository::new(conn);
                let students = SqliteStudentRepository::new(conn);
                let mut created = Vec::with_capacity(normalized.len());
                for (house_id, name) in &normalized {
                    if houses.get_house(*house_id)?.is_none() {
                        return Err(StoreError::ConstraintViolation(format!(
                            "student references missing house {house_id}"
                        )));
                    }
                    created.push(students.create_student(*house_id, name)?);
                }
                Ok(created)
            })
        })
    }

    pub fn get_student(&self, id: StudentId) -> StoreResult<Student> {
        require_positive_id(EntityRef::Student(id))?;
        let conn = self.pool.get()?;
        load_student(&conn, id)
    }

    pub fn list_students(&self) -> StoreResult<Vec<Student>> {
        let conn = self.pool.get()?;
        SqliteStudentRepository::new(&conn).list_students()
    }

    pub fn rename_student(&self, id: StudentId, name: &str) -> StoreResult<Student> {
        require_positive_id(EntityRef::Student(id))?;
        let name = require_name(name, "student name")?;
        let fields = format!("student_id={id}");
        logged("rename_student", "roster", &fields, || {
            self.write(|conn| {
                if !SqliteStudentRepository::new(conn).rename_student(id, &name)? {
                    return Err(StoreError::NotFound(EntityRef::Student(id)));
                }
                load_student(conn, id)
            })
        })
    }

    /// Moves a student to another house.
    ///
    /// Past awards keep the house they were booked to, and the student keeps
    /// their running total; later awards must name the new house.
    ///
    /// # Errors
    /// - `NotFound` when the student does not exist.
    /// - `ConstraintViolation` when the target house does not exist.
    pub fn transfer_student(&self, id: StudentId, house_id: HouseId) -> StoreResult<Student> {
        require_positive_id(EntityRef::Student(id))?;
        require_positive_id(EntityRef::House(house_id))?;
        let fields = format!("student_id={id} house_id={house_id}");
        logged("transfer_student", "roster", &fields, || {
            self.write(|conn| {
                load_student(conn, id)?;
                if SqliteHouseRepository::new(conn).get_house(house_id)?.is_none() {
                    return Err(StoreError::ConstraintViolation(format!(
                        "student transfer references missing house {house_id}"
                    )));
                }
                SqliteStudentRepository::new(conn).set_student_house(id, house_id)?;
                load_student(conn, id)
            })
        })
    }

    fn write<T>(&self, apply: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = apply(&*tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn load_tournament(conn: &Connection, id: TournamentId) -> StoreResult<Tournament> {
    SqliteTournamentRepository::new(conn)
        .get_tournament(id)?
        .ok_or(StoreError::NotFound(EntityRef::Tournament(id)))
}

fn load_house(conn: &Connection, id: HouseId) -> StoreResult<House> {
    SqliteHouseRepository::new(conn)
        .get_house(id)?
        .ok_or(StoreError::NotFound(EntityRef::House(id)))
}

fn load_student(conn: &Connection, id: StudentId) -> StoreResult<Student> {
    SqliteStudentRepository::new(conn)
        .get_student(id)?
        .ok_or(StoreError::NotFound(EntityRef::Student(id)))
}
