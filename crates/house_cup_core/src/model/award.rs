//! Point-award ledger model.
//!
//! # Invariants
//! - `house_id` matched the student's house when the award was booked.
//! - Awards are immutable once written; they disappear only when their
//!   student is removed.

use super::house::HouseId;
use super::student::StudentId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AwardId = i64;

/// One signed point transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointAward {
    pub id: AwardId,
    /// Signed delta; negative values are penalties.
    pub points: i64,
    pub notes: String,
    /// `None` for awards booked to the house only.
    pub student_id: Option<StudentId>,
    pub house_id: HouseId,
    /// Epoch ms booking time.
    pub created_at: i64,
}

/// Input for one award transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAward {
    pub student_id: Option<StudentId>,
    pub house_id: HouseId,
    pub points: i64,
    #[serde(default)]
    pub notes: String,
}

/// Award rows plus their summed points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardLedger {
    pub points: Vec<PointAward>,
    pub total: i64,
}

/// Signed sum of award deltas that does not fit in `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerOverflow {
    pub sum: i128,
}

impl Display for LedgerOverflow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ledger sum {} is outside the i64 range", self.sum)
    }
}

impl Error for LedgerOverflow {}

/// Sums signed award deltas exactly.
///
/// Partial sums are kept in `i128`, so the result does not depend on row
/// order; only the final value has to fit in `i64`.
pub fn ledger_sum(points: impl IntoIterator<Item = i64>) -> Result<i64, LedgerOverflow> {
    let sum: i128 = points.into_iter().map(i128::from).sum();
    i64::try_from(sum).map_err(|_| LedgerOverflow { sum })
}

impl AwardLedger {
    /// Builds a ledger, summing the award deltas.
    pub fn from_awards(awards: Vec<PointAward>) -> Result<Self, LedgerOverflow> {
        let total = ledger_sum(awards.iter().map(|award| award.points))?;
        Ok(Self {
            points: awards,
            total,
        })
    }
}
