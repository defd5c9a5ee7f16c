//! Binary entry point: read settings, start file logging, open the database
//! and run the TUI until the user quits.
use anyhow::Context;
use clap::Parser;
use library_manager::{logging, open_database, run_app, App, Settings};
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    let _guard = logging::init(&settings.log_dir()?, &settings.log_level)?;

    let database = settings.database_path()?;
    info!(path = %database.display(), "starting library manager");
    let conn = open_database(&database)
        .with_context(|| format!("failed to open database at {}", database.display()))?;

    let mut app = App::new(conn).context("failed to load library tables")?;
    let result = run_app(&mut app);
    if let Err(err) = &result {
        error!("{err:#}");
    }
    result
}
