use crate::output::print_json;
use crate::App;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum HouseSubcommand {
    /// Add a house to a tournament
    Create { tournament_id: i64, name: String },
    /// List houses, optionally of one tournament
    List {
        #[arg(long)]
        tournament: Option<i64>,
    },
    /// Show one house
    Get { id: i64 },
    /// Rename a house
    Rename { id: i64, name: String },
    /// Running total of one house
    Total { id: i64 },
    /// Houses of a tournament, highest total first
    Standings { tournament_id: i64 },
}

pub fn run(app: &App, subcmd: HouseSubcommand) -> anyhow::Result<()> {
    match subcmd {
        HouseSubcommand::Create {
            tournament_id,
            name,
        } => print_json(&app.roster.create_house(tournament_id, &name)?),
        HouseSubcommand::List { tournament: None } => print_json(&app.roster.list_houses()?),
        HouseSubcommand::List {
            tournament: Some(tournament_id),
        } => print_json(&app.queries.list_houses_for_tournament(tournament_id)?),
        HouseSubcommand::Get { id } => print_json(&app.roster.get_house(id)?),
        HouseSubcommand::Rename { id, name } => print_json(&app.roster.rename_house(id, &name)?),
        HouseSubcommand::Total { id } => print_json(&app.queries.house_total(id)?),
        HouseSubcommand::Standings { tournament_id } => {
            print_json(&app.queries.house_standings(tournament_id)?)
        }
    }
}
