//! Tournament domain model.
//!
//! # Invariants
//! - `ended_at`, when set, is not earlier than `created_at`.
//! - Timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TournamentId = i64;

/// One house cup competition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    #[serde(rename = "tournament_name")]
    pub name: String,
    pub created_at: i64,
    pub ended_at: Option<i64>,
}

/// Tournament field rule violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TournamentValidationError {
    BlankName,
    EndsBeforeCreated { created_at: i64, ended_at: i64 },
}

impl Display for TournamentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "tournament name must not be blank"),
            Self::EndsBeforeCreated {
                created_at,
                ended_at,
            } => write!(
                f,
                "tournament ended_at {ended_at} is earlier than created_at {created_at}"
            ),
        }
    }
}

impl Error for TournamentValidationError {}

impl Tournament {
    /// Returns whether the tournament is still accepting awards.
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Checks field rules before persistence and after reads.
    pub fn validate(&self) -> Result<(), TournamentValidationError> {
        if self.name.trim().is_empty() {
            return Err(TournamentValidationError::BlankName);
        }
        if let Some(ended_at) = self.ended_at {
            if ended_at < self.created_at {
                return Err(TournamentValidationError::EndsBeforeCreated {
                    created_at: self.created_at,
                    ended_at,
                });
            }
        }
        Ok(())
    }
}
