// mongomigrate/src/migrate/summary.rs
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::{ActionKind, MigrationOptions};
use crate::errors::Result;
use crate::migrate::engine::{CommandRecord, MigrationReport};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub action: ActionKind,
    pub database: String,
    pub location: String,
    pub processed: usize,
    pub failed: usize,
    pub failed_commands: Vec<String>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunSummary {
    pub fn new(
        options: &MigrationOptions,
        report: &MigrationReport,
        started_at: DateTime<Local>,
    ) -> Self {
        RunSummary {
            action: options.action.kind(),
            database: options.connection.database.clone(),
            location: options.action.location().to_string(),
            processed: report.processed.len(),
            failed: report.failed.len(),
            failed_commands: report.failed.iter().map(|r| r.command.clone()).collect(),
            started_at,
            finished_at: Local::now(),
        }
    }

    /// The success line, shown only when at least one collection made it.
    pub fn success_message(&self) -> Option<String> {
        if self.processed == 0 {
            return None;
        }
        match self.action {
            ActionKind::Export => Some(format!(
                "Database '{}' successfully exported to '{}'",
                self.database, self.location
            )),
            ActionKind::Import => Some(format!(
                "Imported collections from '{}' successfully to database '{}'",
                self.location, self.database
            )),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} collections processed", self.processed)?;
        write!(f, "{} errors", self.failed)?;
        for command in &self.failed_commands {
            write!(f, "\n  ✗ {}", command)?;
        }
        if let Some(message) = self.success_message() {
            write!(f, "\n{}", message)?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct RunReportFile<'a> {
    summary: &'a RunSummary,
    processed: &'a [CommandRecord],
    failed: &'a [CommandRecord],
}

/// Writes the summary and both outcome logs as pretty JSON.
pub fn write_report(path: &Path, summary: &RunSummary, report: &MigrationReport) -> Result<()> {
    let file = RunReportFile {
        summary,
        processed: &report.processed,
        failed: &report.failed,
    };
    fs::write(path, serde_json::to_string_pretty(&file)?)?;
    Ok(())
}
