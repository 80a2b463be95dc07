//! House cup domain model.
//!
//! # Responsibility
//! - Define the records persisted by the entity store.
//! - Keep wire field names aligned with the public JSON contract.
//!
//! # Invariants
//! - Ids are positive SQLite row ids assigned by the store.
//! - Running totals (`House::house_points`, `Student::points`) are only ever
//!   changed by the award transaction coordinator.

pub mod award;
pub mod house;
pub mod student;
pub mod tournament;

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Typed reference to one stored row, used in errors and audit reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Tournament(tournament::TournamentId),
    House(house::HouseId),
    Student(student::StudentId),
    Award(award::AwardId),
}

impl EntityRef {
    /// Raw row id carried by the reference.
    pub fn id(self) -> i64 {
        match self {
            Self::Tournament(id) | Self::House(id) | Self::Student(id) | Self::Award(id) => id,
        }
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tournament(id) => write!(f, "tournament {id}"),
            Self::House(id) => write!(f, "house {id}"),
            Self::Student(id) => write!(f, "student {id}"),
            Self::Award(id) => write!(f, "award {id}"),
        }
    }
}

/// A running total that disagrees with the sum of its award ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TotalDrift {
    pub entity: EntityRef,
    /// Denormalized value stored on the row.
    pub recorded: i64,
    /// Sum recomputed from `point_awards`; wider than `i64` so an
    /// out-of-range ledger is still reported.
    pub ledger: i128,
}

/// Trims a display name, returning `None` when nothing is left.
pub fn normalize_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
