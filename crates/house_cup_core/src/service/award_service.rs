//! Award transaction coordinator.
//!
//! # Responsibility
//! - Book point awards as one indivisible unit: ledger row, student total
//!   and house total.
//! - Remove students together with their awards and the house points those
//!   awards contributed.
//!
//! # Invariants
//! - Both operations run inside one `BEGIN IMMEDIATE` transaction, so the
//!   reads they depend on are serialized against every other writer.
//! - `House.house_points` equals the sum of awards booked to the house and
//!   `Student.points` the sum of awards booked to the student, before and
//!   after every call, whether the call succeeds or fails.
//! - Awards are not idempotent: a retried call after a lost acknowledgment
//!   books the award twice.

use super::{check_pool_schema, logged, require_positive_id};
use crate::db::ConnectionPool;
use crate::model::award::{NewAward, PointAward};
use crate::model::student::{Student, StudentId};
use crate::model::EntityRef;
use crate::repo::award_repo::{AwardRepository, HouseContribution, SqliteAwardRepository};
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::house_repo::{HouseRepository, SqliteHouseRepository};
use crate::repo::student_repo::{SqliteStudentRepository, StudentRepository};
use log::warn;
use rusqlite::TransactionBehavior;
use std::sync::Arc;

/// Outcome of a cascading student removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRemoval {
    /// Student row as it was just before deletion.
    pub student: Student,
    /// Number of award rows deleted with the student.
    pub removed_awards: usize,
    /// Points taken back from each house the awards were booked to.
    pub house_adjustments: Vec<HouseContribution>,
}

/// The only writer of running totals.
pub struct AwardService {
    pool: Arc<ConnectionPool>,
}

impl AwardService {
    /// Creates the coordinator over a migrated pool.
    ///
    /// # Errors
    /// - `StoreError::SchemaMismatch` when the pool's database is not at the
    ///   expected schema version.
    pub fn try_new(pool: Arc<ConnectionPool>) -> StoreResult<Self> {
        check_pool_schema(&pool)?;
        Ok(Self { pool })
    }

    /// Books one award and moves both running totals by `award.points`.
    ///
    /// # Contract
    /// - `award.house_id` must reference an existing house.
    /// - `award.student_id`, when set, must reference an existing student
    ///   currently in `award.house_id`.
    /// - On any error nothing is written.
    ///
    /// # Errors
    /// - `ConstraintViolation` for missing house/student, a student outside
    ///   the house, or a total that would overflow.
    /// - `Transient` on lock contention or pool exhaustion; the call may be
    ///   retried but is not idempotent.
    pub fn award_points(&self, award: &NewAward) -> StoreResult<PointAward> {
        require_positive_id(EntityRef::House(award.house_id))?;
        if let Some(student_id) = award.student_id {
            require_positive_id(EntityRef::Student(student_id))?;
        }

        let fields = format!(
            "house_id={} student_id={} points={}",
            award.house_id,
            award
                .student_id
                .map_or_else(|| "none".to_string(), |id| id.to_string()),
            award.points
        );
        logged("award_points", "award", &fields, || self.book_award(award))
    }

    /// Deletes a student, every award booked to them, and the points those
    /// awards added to house totals.
    ///
    /// # Errors
    /// - `NotFound` when the student does not exist; nothing is deleted.
    /// - `ConstraintViolation` when a house total cannot absorb the points
    ///   taken back; nothing is deleted.
    pub fn remove_student(&self, student_id: StudentId) -> StoreResult<StudentRemoval> {
        require_positive_id(EntityRef::Student(student_id))?;
        let fields = format!("student_id={student_id}");
        logged("remove_student", "award", &fields, || {
            self.cascade_remove(student_id)
        })
    }

    fn book_award(&self, award: &NewAward) -> StoreResult<PointAward> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created = {
            let houses = SqliteHouseRepository::new(&tx);
            let students = SqliteStudentRepository::new(&tx);
            let awards = SqliteAwardRepository::new(&tx);

            let house = houses.get_house(award.house_id)?.ok_or_else(|| {
                StoreError::ConstraintViolation(format!(
                    "award references missing house {}",
                    award.house_id
                ))
            })?;
            checked_total(EntityRef::House(house.id), house.house_points, award.points)?;

            if let Some(student_id) = award.student_id {
                let student = students.get_student(student_id)?.ok_or_else(|| {
                    StoreError::ConstraintViolation(format!(
                        "award references missing student {student_id}"
                    ))
                })?;
                if student.house_id != award.house_id {
                    return Err(StoreError::ConstraintViolation(format!(
                        "student {student_id} belongs to house {}, not house {}",
                        student.house_id, award.house_id
                    )));
                }
                checked_total(EntityRef::Student(student_id), student.points, award.points)?;
            }

            let created = awards.insert_award(award)?;
            if let Some(student_id) = award.student_id {
                if !students.add_student_points(student_id, award.points)? {
                    return Err(StoreError::ConstraintViolation(format!(
                        "student {student_id} disappeared during award"
                    )));
                }
            }
            if !houses.add_house_points(award.house_id, award.points)? {
                return Err(StoreError::ConstraintViolation(format!(
                    "house {} disappeared during award",
                    award.house_id
                )));
            }
            created
        };

        tx.commit()?;
        Ok(created)
    }

    fn cascade_remove(&self, student_id: StudentId) -> StoreResult<StudentRemoval> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removal = {
            let houses = SqliteHouseRepository::new(&tx);
            let students = SqliteStudentRepository::new(&tx);
            let awards = SqliteAwardRepository::new(&tx);

            // Read before any delete; the immediate lock keeps these values current.
            let student = students
                .get_student(student_id)?
                .ok_or(StoreError::NotFound(EntityRef::Student(student_id)))?;
            let house_adjustments = awards.student_contributions(student_id)?;

            let ledger_total: i128 = house_adjustments
                .iter()
                .map(|entry| i128::from(entry.points))
                .sum();
            if ledger_total != i128::from(student.points) {
                warn!(
                    "event=remove_student module=award status=drift student_id={} recorded={} ledger={}",
                    student_id, student.points, ledger_total
                );
            }

            // Every house must absorb its decrement before anything is deleted.
            let mut decrements = Vec::with_capacity(house_adjustments.len());
            for adjustment in &house_adjustments {
                let house = houses.get_house(adjustment.house_id)?.ok_or_else(|| {
                    StoreError::ConstraintViolation(format!(
                        "awards of student {student_id} reference missing house {}",
                        adjustment.house_id
                    ))
                })?;
                let delta = adjustment.points.checked_neg().ok_or_else(|| {
                    StoreError::ConstraintViolation(format!(
                        "{} points booked to house {} cannot be taken back",
                        adjustment.points, adjustment.house_id
                    ))
                })?;
                checked_total(EntityRef::House(house.id), house.house_points, delta)?;
                decrements.push((house.id, delta));
            }

            let removed_awards = awards.delete_awards_for_student(student_id)?;
            if !students.delete_student(student_id)? {
                return Err(StoreError::NotFound(EntityRef::Student(student_id)));
            }
            for (house_id, delta) in decrements {
                if !houses.add_house_points(house_id, delta)? {
                    return Err(StoreError::ConstraintViolation(format!(
                        "house {house_id} disappeared during student removal"
                    )));
                }
            }

            StudentRemoval {
                student,
                removed_awards,
                house_adjustments,
            }
        };

        tx.commit()?;
        Ok(removal)
    }
}

fn checked_total(entity: EntityRef, current: i64, delta: i64) -> StoreResult<i64> {
    current.checked_add(delta).ok_or_else(|| {
        StoreError::ConstraintViolation(format!(
            "{entity} total {current} cannot absorb {delta} points"
        ))
    })
}
