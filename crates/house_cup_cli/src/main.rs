//! `house-cup` command line front end.
//!
//! # Responsibility
//! - Parse typed arguments and call the core services.
//! - Print JSON records on success; exit non-zero with the error chain on failure.

mod cmd;
mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cmd::{
    house::HouseSubcommand, points::PointsSubcommand, student::StudentSubcommand,
    tournament::TournamentSubcommand,
};
use house_cup_core::{
    init_from_config, open_pool, AwardService, HouseCupConfig, QueryService, RosterService,
};
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "house-cup",
    about = "House cup points: tournaments, houses, students and point awards",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ./house_cup.toml when present)
    #[arg(long, global = true, env = "HOUSE_CUP_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path, overriding configuration
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tournaments
    Tournament {
        #[command(subcommand)]
        subcommand: TournamentSubcommand,
    },
    /// Manage houses and read standings
    House {
        #[command(subcommand)]
        subcommand: HouseSubcommand,
    },
    /// Manage students
    Student {
        #[command(subcommand)]
        subcommand: StudentSubcommand,
    },
    /// Award points and read the ledger
    Points {
        #[command(subcommand)]
        subcommand: PointsSubcommand,
    },
    /// Recompute every running total from the ledger and report drift
    Audit,
}

/// Services sharing one connection pool for the lifetime of the process.
pub struct App {
    pub roster: RosterService,
    pub awards: AwardService,
    pub queries: QueryService,
}

impl App {
    fn open(config: &HouseCupConfig) -> anyhow::Result<Self> {
        let pool = Arc::new(
            open_pool(&config.database)
                .with_context(|| format!("failed to open database `{}`", config.database.path))?,
        );
        Ok(Self {
            roster: RosterService::try_new(Arc::clone(&pool))?,
            awards: AwardService::try_new(Arc::clone(&pool))?,
            queries: QueryService::try_new(pool)?,
        })
    }
}

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => HouseCupConfig::load_from(path),
        None => HouseCupConfig::load(),
    }
    .context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }

    init_from_config(&config.logging)
        .map_err(anyhow::Error::msg)
        .context("failed to start logging")?;
    debug!(
        "event=config_load module=cli status=ok db_path={} pool_size={}",
        config.database.path, config.database.pool_size
    );

    let app = App::open(&config)?;
    match cli.command {
        Commands::Tournament { subcommand } => cmd::tournament::run(&app, subcommand),
        Commands::House { subcommand } => cmd::house::run(&app, subcommand),
        Commands::Student { subcommand } => cmd::student::run(&app, subcommand),
        Commands::Points { subcommand } => cmd::points::run(&app, subcommand),
        Commands::Audit => output::print_json(&app.queries.audit_totals()?),
    }
}
