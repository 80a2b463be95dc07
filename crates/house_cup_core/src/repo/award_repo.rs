//! Point-award ledger repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Append award rows and read them back in insertion order.
//! - Recompute ledger sums for cascade deletes and total audits.
//!
//! # Invariants
//! - Ledger listings are ordered by `id ASC` (insertion order).
//! - House listings filter on `point_awards.house_id`, so house-only awards
//!   (`student_id IS NULL`) are included.
//! - Ledger sums are accumulated in `i128` rather than with SQL `SUM`, which
//!   fails on an out-of-range partial sum.

use crate::model::award::{NewAward, PointAward};
use crate::model::house::HouseId;
use crate::model::student::StudentId;
use crate::model::{EntityRef, TotalDrift};
use crate::repo::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

const AWARD_SELECT_SQL: &str = "SELECT
    id,
    points,
    notes,
    student_id,
    house_id,
    created_at
FROM point_awards";

/// Points one house gains or loses from a set of awards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HouseContribution {
    pub house_id: HouseId,
    pub points: i64,
}

/// Repository interface for the award ledger.
pub trait AwardRepository {
    fn insert_award(&self, award: &NewAward) -> StoreResult<PointAward>;
    fn list_awards(&self) -> StoreResult<Vec<PointAward>>;
    fn list_awards_for_student(&self, student_id: StudentId) -> StoreResult<Vec<PointAward>>;
    fn list_awards_for_house(&self, house_id: HouseId) -> StoreResult<Vec<PointAward>>;
    /// Sums one student's awards per booked house.
    fn student_contributions(&self, student_id: StudentId)
        -> StoreResult<Vec<HouseContribution>>;
    /// Deletes one student's awards, returning the number of rows removed.
    fn delete_awards_for_student(&self, student_id: StudentId) -> StoreResult<usize>;
    /// Lists every student and house whose running total differs from its
    /// ledger sum.
    fn total_drifts(&self) -> StoreResult<Vec<TotalDrift>>;
}

/// SQLite-backed award ledger repository.
pub struct SqliteAwardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAwardRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_awards(&self, sql: &str, filter_id: Option<i64>) -> StoreResult<Vec<PointAward>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match filter_id {
            Some(filter_id) => stmt.query([filter_id])?,
            None => stmt.query([])?,
        };
        let mut awards = Vec::new();
        while let Some(row) = rows.next()? {
            awards.push(parse_award_row(row)?);
        }
        Ok(awards)
    }
}

impl AwardRepository for SqliteAwardRepository<'_> {
    fn insert_award(&self, award: &NewAward) -> StoreResult<PointAward> {
        self.conn.execute(
            "INSERT INTO point_awards (points, notes, student_id, house_id)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                award.points,
                award.notes.as_str(),
                award.student_id,
                award.house_id,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let mut awards = self.query_awards(&format!("{AWARD_SELECT_SQL} WHERE id = ?1;"), Some(id))?;
        awards
            .pop()
            .ok_or_else(|| StoreError::InvalidData(format!("award {id} vanished after insert")))
    }

    fn list_awards(&self) -> StoreResult<Vec<PointAward>> {
        self.query_awards(&format!("{AWARD_SELECT_SQL} ORDER BY id ASC;"), None)
    }

    fn list_awards_for_student(&self, student_id: StudentId) -> StoreResult<Vec<PointAward>> {
        self.query_awards(
            &format!("{AWARD_SELECT_SQL} WHERE student_id = ?1 ORDER BY id ASC;"),
            Some(student_id),
        )
    }

    fn list_awards_for_house(&self, house_id: HouseId) -> StoreResult<Vec<PointAward>> {
        self.query_awards(
            &format!("{AWARD_SELECT_SQL} WHERE house_id = ?1 ORDER BY id ASC;"),
            Some(house_id),
        )
    }

    fn student_contributions(
        &self,
        student_id: StudentId,
    ) -> StoreResult<Vec<HouseContribution>> {
        let mut stmt = self
            .conn
            .prepare("SELECT house_id, points FROM point_awards WHERE student_id = ?1;")?;
        let mut rows = stmt.query([student_id])?;
        let mut sums: BTreeMap<HouseId, i128> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let points: i64 = row.get(1)?;
            *sums.entry(row.get(0)?).or_default() += i128::from(points);
        }

        sums.into_iter()
            .map(|(house_id, sum)| {
                let points = i64::try_from(sum).map_err(|_| {
                    StoreError::ConstraintViolation(format!(
                        "awards of student {student_id} to house {house_id} sum to {sum}, outside the i64 range"
                    ))
                })?;
                Ok(HouseContribution { house_id, points })
            })
            .collect()
    }

    fn delete_awards_for_student(&self, student_id: StudentId) -> StoreResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM point_awards WHERE student_id = ?1;", [student_id])?;
        Ok(removed)
    }

    fn total_drifts(&self) -> StoreResult<Vec<TotalDrift>> {
        let mut student_ledgers: BTreeMap<StudentId, i128> = BTreeMap::new();
        let mut house_ledgers: BTreeMap<HouseId, i128> = BTreeMap::new();
        let mut stmt = self
            .conn
            .prepare("SELECT student_id, house_id, points FROM point_awards;")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let points: i64 = row.get(2)?;
            let student_id: Option<StudentId> = row.get(0)?;
            if let Some(student_id) = student_id {
                *student_ledgers.entry(student_id).or_default() += i128::from(points);
            }
            *house_ledgers.entry(row.get(1)?).or_default() += i128::from(points);
        }

        let mut drifts = Vec::new();
        collect_drifts(
            self.conn,
            "SELECT id, points FROM students ORDER BY id ASC;",
            &student_ledgers,
            EntityRef::Student,
            &mut drifts,
        )?;
        collect_drifts(
            self.conn,
            "SELECT id, house_points FROM houses ORDER BY id ASC;",
            &house_ledgers,
            EntityRef::House,
            &mut drifts,
        )?;
        Ok(drifts)
    }
}

/// Compares `(id, recorded)` rows from `sql` against ledger sums.
fn collect_drifts(
    conn: &Connection,
    sql: &str,
    ledgers: &BTreeMap<i64, i128>,
    entity: fn(i64) -> EntityRef,
    drifts: &mut Vec<TotalDrift>,
) -> StoreResult<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let recorded: i64 = row.get(1)?;
        let ledger = ledgers.get(&id).copied().unwrap_or(0);
        if i128::from(recorded) != ledger {
            drifts.push(TotalDrift {
                entity: entity(id),
                recorded,
                ledger,
            });
        }
    }
    Ok(())
}

fn parse_award_row(row: &Row<'_>) -> StoreResult<PointAward> {
    Ok(PointAward {
        id: row.get("id")?,
        points: row.get("points")?,
        notes: row.get("notes")?,
        student_id: row.get("student_id")?,
        house_id: row.get("house_id")?,
        created_at: row.get("created_at")?,
    })
}
