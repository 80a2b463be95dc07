pub mod house;
pub mod points;
pub mod student;
pub mod tournament;
