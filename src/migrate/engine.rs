// mongomigrate/src/migrate/engine.rs
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MigrationOptions;
use crate::errors::Result;
use crate::migrate::command::{build_command, MigrationCommand};
use crate::migrate::resolver::resolve_collections;
use crate::utils::process::ProcessRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed,
}

/// A command line that was run, with its outcome. Passwords are masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRecord {
    pub collection: String,
    pub command: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandRecord {
    fn succeeded(collection: &str, command: &MigrationCommand) -> Self {
        CommandRecord {
            collection: collection.to_string(),
            command: command.redacted(),
            outcome: Outcome::Succeeded,
            error: None,
        }
    }

    fn failed(collection: &str, command: &MigrationCommand, error: String) -> Self {
        CommandRecord {
            collection: collection.to_string(),
            command: command.redacted(),
            outcome: Outcome::Failed,
            error: Some(error),
        }
    }
}

/// The two ordered outcome logs of a single run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MigrationReport {
    pub processed: Vec<CommandRecord>,
    pub failed: Vec<CommandRecord>,
}

/// Runs one import/export command per collection, strictly one after another.
///
/// A failing collection is recorded and the run moves on; only a failure to
/// resolve the working set aborts it.
pub struct MigrationEngine<'a, R: ?Sized> {
    options: &'a MigrationOptions,
    runner: &'a R,
}

impl<'a, R: ProcessRunner + ?Sized> MigrationEngine<'a, R> {
    pub fn new(options: &'a MigrationOptions, runner: &'a R) -> Self {
        MigrationEngine { options, runner }
    }

    pub async fn run(&self) -> Result<MigrationReport> {
        let collections = resolve_collections(self.options, self.runner).await?;
        let action = self.options.action.kind().as_str();
        info!("Collections to {}: {:?}", action, collections);

        let mut report = MigrationReport::default();

        for (index, collection) in collections.iter().enumerate() {
            let Some(command) = build_command(
                &self.options.action,
                &self.options.connection,
                &self.options.tools,
                collection,
            ) else {
                debug!("Skipping blank collection name at position {}", index);
                continue;
            };

            info!(
                "[{}/{}] Running {} for collection '{}'",
                index + 1,
                collections.len(),
                action,
                collection
            );
            debug!("{}", command.redacted());

            let output = self.runner.run(&command).await;
            let tool_log = output.stderr.trim();
            if !tool_log.is_empty() {
                debug!("{} reported: {}", command.program, tool_log);
            }

            if output.succeeded() {
                info!("✓ {} processed", command.redacted());
                report.processed.push(CommandRecord::succeeded(collection, &command));
            } else {
                let err = output.error.map(|e| e.to_string()).unwrap_or_default();
                warn!(
                    "Error during executing command: {}. Omitted. ({})",
                    command.redacted(),
                    err
                );
                report.failed.push(CommandRecord::failed(collection, &command, err));
            }
        }

        Ok(report)
    }
}
