use crate::output::print_json;
use crate::App;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum TournamentSubcommand {
    /// Start a tournament
    Create {
        name: String,
        /// Start time in epoch milliseconds (default: now)
        #[arg(long)]
        created_at: Option<i64>,
    },
    /// List all tournaments
    List,
    /// Show one tournament
    Get { id: i64 },
    /// Rename a tournament
    Rename { id: i64, name: String },
    /// Close a tournament
    End {
        id: i64,
        /// End time in epoch milliseconds (default: now)
        #[arg(long)]
        ended_at: Option<i64>,
    },
}

pub fn run(app: &App, subcmd: TournamentSubcommand) -> anyhow::Result<()> {
    match subcmd {
        TournamentSubcommand::Create { name, created_at } => {
            print_json(&app.roster.create_tournament(&name, created_at)?)
        }
        TournamentSubcommand::List => print_json(&app.roster.list_tournaments()?),
        TournamentSubcommand::Get { id } => print_json(&app.roster.get_tournament(id)?),
        TournamentSubcommand::Rename { id, name } => {
            print_json(&app.roster.rename_tournament(id, &name)?)
        }
        TournamentSubcommand::End { id, ended_at } => {
            print_json(&app.roster.end_tournament(id, ended_at)?)
        }
    }
}
