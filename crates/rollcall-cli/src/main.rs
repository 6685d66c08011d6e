use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rollcall_cli::commands::{cards, report, session};
use rollcall_cli::{CardsAction, Cli, Commands, Config, SessionAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(rollcall_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db =
        rollcall_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Session { action }) => match action {
            SessionAction::Run {
                duration_secs,
                cutoff_secs,
                date,
                json,
            } => {
                let (mut db, config) = open_database(cli.config.as_deref())?;
                let opts = session::RunOptions {
                    duration_secs: *duration_secs,
                    cutoff_secs: *cutoff_secs,
                    date: *date,
                    json: *json,
                };
                session::run(&mut stdout, &mut db, &config, opts)?;
            }
        },
        Some(Commands::Cards { action }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            match action {
                CardsAction::Enroll { id, name, uid } => {
                    cards::enroll(&mut stdout, &mut db, &config, id, name, uid.as_deref())?;
                }
                CardsAction::Show { uid } => {
                    cards::show(&mut stdout, &db, &config, uid.as_deref())?;
                }
                CardsAction::Remove { uid } => {
                    cards::remove(&mut stdout, &mut db, &config, uid.as_deref())?;
                }
                CardsAction::List { json } => {
                    cards::list(&mut stdout, &db, *json)?;
                }
            }
        }
        Some(Commands::Report { date, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            report::run(&mut stdout, &db, *date, *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
