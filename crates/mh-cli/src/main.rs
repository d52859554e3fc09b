use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mh_cli::commands::{categories, import, report, settings, status, timer};
use mh_cli::{CategoriesAction, Cli, Commands, Config, SettingsAction};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(mh_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = mh_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Start(args) => timer::start(&mut out, &mut db, args, Utc::now())?,
        Commands::Stop(args) => timer::stop(&mut out, &mut db, args, Utc::now())?,
        Commands::Status => status::run(&mut out, &db, &config.database_path, &Local::now())?,
        Commands::Report(args) => report::run(&mut out, &db, &config, args, &Local::now())?,
        Commands::Import(args) => {
            import::run(&mut out, &mut db, args)?;
        }
        Commands::Categories(action) => match action {
            CategoriesAction::List => categories::list(&mut out, &db)?,
            CategoriesAction::Add { name } => {
                categories::add(&mut out, &mut db, name)?;
            }
        },
        Commands::Settings(action) => match action {
            SettingsAction::Show => settings::show(&mut out, &db)?,
            SettingsAction::DefaultCategory { id } => {
                settings::set_default_category(&mut out, &mut db, *id)?;
            }
        },
    }

    out.flush()?;
    Ok(())
}
