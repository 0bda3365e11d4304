//! MongoDB Collection Migration Tool
//!
//! Exports collections to JSON files or imports them back, driving
//! mongoexport/mongoimport once per collection.

// mongomigrate/src/main.rs
mod cli;
mod config;
mod errors;
mod migrate;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::{ActionKind, AppConfig, RawJsonConfig, RawOptions};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Main entry point for the migration tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run_app(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_app(cli: Cli) -> Result<()> {
    let choice = match (&cli.action, cli.import_flag, cli.export_flag) {
        (Some(action), _, _) => action.trim().to_string(),
        (None, true, _) => "import".to_string(),
        (None, _, true) => "export".to_string(),
        (None, false, false) => prompt_choice()?,
    };
    let action = ActionKind::parse(&choice)?;

    let file_config = RawJsonConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration file")?;

    let options = RawOptions::from_sources(&cli, file_config, Some(action))
        .context("Failed to assemble migration options")?
        .validate()?;

    let app_config = AppConfig {
        options,
        dry_run: cli.dry_run,
        report_path: cli.report.clone(),
    };

    migrate::run_migration_flow(&app_config).await?;
    Ok(())
}

/// Prompts user to select export or import
///
/// Returns the user's choice as String
fn prompt_choice() -> Result<String> {
    use std::io::{stdin, stdout, Write};

    println!("Select an operation:");
    println!("1. Export collections (or type 'export')");
    println!("2. Import collections (or type 'import')");
    print!("Enter your choice: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin().read_line(&mut input).context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
