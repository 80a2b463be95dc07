//! House domain model.

use super::tournament::TournamentId;
use serde::{Deserialize, Serialize};

pub type HouseId = i64;

/// A team inside one tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct House {
    pub id: HouseId,
    #[serde(rename = "house_name")]
    pub name: String,
    /// Running total of every award booked against this house.
    pub house_points: i64,
    pub tournament_id: TournamentId,
}
