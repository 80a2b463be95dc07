use crate::output::print_json;
use crate::App;
use anyhow::Context;
use clap::Subcommand;
use house_cup_core::NewStudent;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum StudentSubcommand {
    /// Enrol one student in a house
    Create { house_id: i64, name: String },
    /// Enrol students from a JSON array of `{"student_name", "house_id"}`;
    /// one bad entry rejects the whole file
    CreateMany { file: PathBuf },
    /// List students, optionally of one house or tournament
    List {
        #[arg(long, conflicts_with = "tournament")]
        house: Option<i64>,
        #[arg(long)]
        tournament: Option<i64>,
    },
    /// Show one student
    Get { id: i64 },
    /// Rename a student
    Rename { id: i64, name: String },
    /// Move a student to another house
    Transfer { id: i64, house_id: i64 },
    /// Running total of one student
    Total { id: i64 },
    /// Delete a student, their awards, and the house points those awards added
    Remove { id: i64 },
}

pub fn run(app: &App, subcmd: StudentSubcommand) -> anyhow::Result<()> {
    match subcmd {
        StudentSubcommand::Create { house_id, name } => {
            print_json(&app.roster.create_student(house_id, &name)?)
        }
        StudentSubcommand::CreateMany { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let enrolments: Vec<NewStudent> = serde_json::from_str(&raw)
                .with_context(|| format!("`{}` is not a student array", file.display()))?;
            print_json(&app.roster.create_students(&enrolments)?)
        }
        StudentSubcommand::List {
            house: Some(house_id),
            ..
        } => print_json(&app.queries.list_students_for_house(house_id)?),
        StudentSubcommand::List {
            tournament: Some(tournament_id),
            ..
        } => print_json(&app.queries.list_students_for_tournament(tournament_id)?),
        StudentSubcommand::List { .. } => print_json(&app.roster.list_students()?),
        StudentSubcommand::Get { id } => print_json(&app.roster.get_student(id)?),
        StudentSubcommand::Rename { id, name } => {
            print_json(&app.roster.rename_student(id, &name)?)
        }
        StudentSubcommand::Transfer { id, house_id } => {
            print_json(&app.roster.transfer_student(id, house_id)?)
        }
        StudentSubcommand::Total { id } => print_json(&app.queries.student_total(id)?),
        StudentSubcommand::Remove { id } => {
            let removal = app.awards.remove_student(id)?;
            print_json(&removal.student)
        }
    }
}
