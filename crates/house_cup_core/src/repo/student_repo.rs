//! Student repository contract and SQLite implementation.
//!
//! # Invariants
//! - New students start with `points = 0`.
//! - `add_student_points` is a single-statement increment.
//! - Tournament listing joins through `houses`; students never store a
//!   tournament id of their own.

use crate::model::house::HouseId;
use crate::model::student::{Student, StudentId};
use crate::model::tournament::TournamentId;
use crate::repo::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, Row};

const STUDENT_SELECT_SQL: &str = "SELECT
    s.id AS id,
    s.student_name AS student_name,
    s.points AS points,
    s.house_id AS house_id
FROM students s";

/// Repository interface for student rows.
pub trait StudentRepository {
    fn create_student(&self, house_id: HouseId, name: &str) -> StoreResult<Student>;
    fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>>;
    fn list_students(&self) -> StoreResult<Vec<Student>>;
    fn list_students_for_house(&self, house_id: HouseId) -> StoreResult<Vec<Student>>;
    fn list_students_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Student>>;
    /// Returns `false` when no row matched.
    fn rename_student(&self, id: StudentId, name: &str) -> StoreResult<bool>;
    /// Moves the student row only; running totals and past awards stay put.
    fn set_student_house(&self, id: StudentId, house_id: HouseId) -> StoreResult<bool>;
    /// Adds a signed delta to the running total. Returns `false` when no row
    /// matched.
    fn add_student_points(&self, id: StudentId, delta: i64) -> StoreResult<bool>;
    /// Returns `false` when no row matched.
    fn delete_student(&self, id: StudentId) -> StoreResult<bool>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_students(&self, sql: &str, filter_id: Option<i64>) -> StoreResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match filter_id {
            Some(filter_id) => stmt.query([filter_id])?,
            None => stmt.query([])?,
        };
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn create_student(&self, house_id: HouseId, name: &str) -> StoreResult<Student> {
        self.conn.execute(
            "INSERT INTO students (student_name, points, house_id)
             VALUES (?1, 0, ?2);",
            params![name, house_id],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_student(id)?
            .ok_or_else(|| StoreError::InvalidData(format!("student {id} vanished after insert")))
    }

    fn get_student(&self, id: StudentId) -> StoreResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE s.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }
        Ok(None)
    }

    fn list_students(&self) -> StoreResult<Vec<Student>> {
        self.query_students(&format!("{STUDENT_SELECT_SQL} ORDER BY s.id ASC;"), None)
    }

    fn list_students_for_house(&self, house_id: HouseId) -> StoreResult<Vec<Student>> {
        self.query_students(
            &format!("{STUDENT_SELECT_SQL} WHERE s.house_id = ?1 ORDER BY s.id ASC;"),
            Some(house_id),
        )
    }

    fn list_students_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Student>> {
        self.query_students(
            &format!(
                "{STUDENT_SELECT_SQL}
                 INNER JOIN houses h ON h.id = s.house_id
                 WHERE h.tournament_id = ?1
                 ORDER BY s.id ASC;"
            ),
            Some(tournament_id),
        )
    }

    fn rename_student(&self, id: StudentId, name: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE students SET student_name = ?2 WHERE id = ?1;",
            params![id, name],
        )?;
        Ok(changed > 0)
    }

    fn set_student_house(&self, id: StudentId, house_id: HouseId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE students SET house_id = ?2 WHERE id = ?1;",
            params![id, house_id],
        )?;
        Ok(changed > 0)
    }

    fn add_student_points(&self, id: StudentId, delta: i64) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE students SET points = points + ?2 WHERE id = ?1;",
            params![id, delta],
        )?;
        Ok(changed > 0)
    }

    fn delete_student(&self, id: StudentId) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn parse_student_row(row: &Row<'_>) -> StoreResult<Student> {
    Ok(Student {
        id: row.get("id")?,
        name: row.get("student_name")?,
        points: row.get("points")?,
        house_id: row.get("house_id")?,
    })
}
