pub(crate) mod command;
pub(crate) mod engine;
pub(crate) mod resolver;
pub(crate) mod summary;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{error, info};

use crate::config::{Action, ActionKind, AppConfig};
use crate::utils::find_executable;
use crate::utils::process::{DryRunRunner, ProcessRunner, SystemRunner};
use engine::MigrationEngine;
use summary::RunSummary;

/// Public entry point for an import or export run.
///
/// Resolves the working set, migrates each collection in order, prints the
/// summary and writes the optional JSON report.
pub async fn run_migration_flow(app_config: &AppConfig) -> Result<RunSummary> {
    let options = &app_config.options;
    let kind = options.action.kind();

    if !app_config.dry_run {
        let tool = options.tools.for_action(kind);
        let path = find_executable(tool)?;
        info!("Found {} executable at: {}", tool, path.display());
    }
    if kind == ActionKind::Export && options.collections.is_empty() {
        let path = find_executable(&options.tools.shell)?;
        info!("Found {} executable at: {}", options.tools.shell, path.display());
    }

    let system_runner = SystemRunner::new(options.timeout);
    let runner: Box<dyn ProcessRunner> = if app_config.dry_run {
        info!("Dry run: commands will be printed, not executed");
        Box::new(DryRunRunner::new(system_runner))
    } else {
        Box::new(system_runner)
    };

    match &options.action {
        Action::Export { output } => info!(
            "Exporting database '{}' from {} to {}",
            options.connection.database, options.connection.host, output
        ),
        Action::Import { from } => info!(
            "Importing {} into database '{}' on {}",
            from, options.connection.database, options.connection.host
        ),
    }

    let started_at = Local::now();
    let report = MigrationEngine::new(options, runner.as_ref())
        .run()
        .await
        .context("Migration aborted before any collection was processed")?;

    let summary = RunSummary::new(options, &report, started_at);
    println!("{}", summary);

    // The summary is already out; a lost report does not change the run's outcome.
    if let Some(path) = &app_config.report_path {
        match summary::write_report(path, &summary, &report) {
            Ok(()) => info!("Run report written to {}", path.display()),
            Err(e) => error!("Failed to write run report to {}: {}", path.display(), e),
        }
    }

    Ok(summary)
}
