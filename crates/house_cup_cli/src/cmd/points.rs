use crate::output::print_json;
use crate::App;
use clap::Subcommand;
use house_cup_core::NewAward;

#[derive(Subcommand)]
pub enum PointsSubcommand {
    /// Book a signed award against a house, optionally through a student
    Award {
        #[arg(long)]
        house: i64,
        #[arg(long)]
        student: Option<i64>,
        /// Signed delta; negative values are penalties
        #[arg(long, allow_hyphen_values = true)]
        points: i64,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List every award in booking order
    List,
    /// Awards of one student with their sum
    Student { id: i64 },
    /// Awards of one house with their sum
    House { id: i64 },
}

pub fn run(app: &App, subcmd: PointsSubcommand) -> anyhow::Result<()> {
    match subcmd {
        PointsSubcommand::Award {
            house,
            student,
            points,
            notes,
        } => {
            let award = NewAward {
                student_id: student,
                house_id: house,
                points,
                notes,
            };
            print_json(&app.awards.award_points(&award)?)
        }
        PointsSubcommand::List => print_json(&app.queries.list_awards()?),
        PointsSubcommand::Student { id } => print_json(&app.queries.student_ledger(id)?),
        PointsSubcommand::House { id } => print_json(&app.queries.house_ledger(id)?),
    }
}
