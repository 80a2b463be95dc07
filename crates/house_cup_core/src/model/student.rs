//! Student domain model.

use super::house::HouseId;
use serde::{Deserialize, Serialize};

pub type StudentId = i64;

/// A competitor belonging to one house.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    #[serde(rename = "student_name")]
    pub name: String,
    /// Running total of every award booked against this student.
    pub points: i64,
    pub house_id: HouseId,
}

/// Input for one student enrolment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewStudent {
    #[serde(rename = "student_name")]
    pub name: String,
    pub house_id: HouseId,
}
