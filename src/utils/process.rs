// mongomigrate/src/utils/process.rs
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::migrate::command::{CommandKind, MigrationCommand};

/// Captured result of one external command.
///
/// `error` is `Some` exactly when the process could not be spawned, timed out,
/// or exited with a failure status. A failing command is never an `Err`.
#[derive(Debug)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub error: Option<AppError>,
}

impl ProcessOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        ProcessOutput {
            stdout: stdout.into(),
            stderr: String::new(),
            error: None,
        }
    }

    pub fn failure(error: AppError) -> Self {
        ProcessOutput {
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &MigrationCommand) -> ProcessOutput;
}

/// Spawns the program directly with its argument vector; no shell is involved.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        SystemRunner { timeout }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &MigrationCommand) -> ProcessOutput {
        let mut child = Command::new(&command.program);
        child.args(&command.args).kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => match timeout(limit, child.output()).await {
                Ok(result) => result,
                Err(_) => {
                    return ProcessOutput::failure(AppError::Timeout {
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.output().await,
        };

        let output = match output {
            Ok(output) => output,
            Err(source) => {
                return ProcessOutput::failure(AppError::Spawn {
                    program: command.program.clone(),
                    source,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!("{} exited with {}", command.program, output.status);

        let error = if output.status.success() {
            None
        } else {
            Some(AppError::Command {
                status: output.status.to_string(),
                stdout: stdout.clone(),
                stderr: stderr.trim().to_string(),
            })
        };

        ProcessOutput {
            stdout,
            stderr,
            error,
        }
    }
}

/// Logs export/import commands instead of running them.
/// Introspection still goes to the wrapped runner so collections can be discovered.
pub struct DryRunRunner<R> {
    inner: R,
}

impl<R: ProcessRunner> DryRunRunner<R> {
    pub fn new(inner: R) -> Self {
        DryRunRunner { inner }
    }
}

#[async_trait]
impl<R: ProcessRunner> ProcessRunner for DryRunRunner<R> {
    async fn run(&self, command: &MigrationCommand) -> ProcessOutput {
        match command.kind {
            CommandKind::Introspect => self.inner.run(command).await,
            CommandKind::Export | CommandKind::Import => {
                info!("[dry-run] {}", command.redacted());
                ProcessOutput::success("")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn command(kind: CommandKind, program: &str, args: &[&str]) -> MigrationCommand {
        MigrationCommand::new(kind, program, args.iter().map(|a| a.to_string()).collect())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let runner = SystemRunner::default();
        let output = runner
            .run(&command(CommandKind::Introspect, "echo", &["users,orders"]))
            .await;

        assert!(output.succeeded());
        assert_eq!(output.stdout.trim(), "users,orders");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_reports_failed_status_without_raising() {
        let runner = SystemRunner::default();
        let output = runner
            .run(&command(CommandKind::Export, "sh", &["-c", "echo boom >&2; exit 3"]))
            .await;

        assert!(!output.succeeded());
        assert_eq!(output.stderr.trim(), "boom");
        assert!(matches!(
            output.error,
            Some(AppError::Command { ref stderr, .. }) if stderr == "boom"
        ));
    }

    #[tokio::test]
    async fn test_system_runner_reports_spawn_failure() {
        let runner = SystemRunner::default();
        let output = runner
            .run(&command(CommandKind::Export, "mongomigrate-no-such-tool", &[]))
            .await;

        assert!(matches!(output.error, Some(AppError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_times_out() {
        let runner = SystemRunner::new(Some(Duration::from_millis(200)));
        let output = runner
            .run(&command(CommandKind::Import, "sleep", &["5"]))
            .await;

        assert!(matches!(output.error, Some(AppError::Timeout { .. })));
    }

    struct RecordingRunner {
        seen: Mutex<Vec<CommandKind>>,
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, command: &MigrationCommand) -> ProcessOutput {
            self.seen.lock().unwrap().push(command.kind);
            ProcessOutput::success("users")
        }
    }

    #[tokio::test]
    async fn test_dry_run_only_forwards_introspection() {
        let runner = DryRunRunner::new(RecordingRunner {
            seen: Mutex::new(Vec::new()),
        });

        let export = runner.run(&command(CommandKind::Export, "mongoexport", &[])).await;
        let introspect = runner.run(&command(CommandKind::Introspect, "mongo", &[])).await;

        assert!(export.succeeded());
        assert_eq!(introspect.stdout, "users");
        assert_eq!(*runner.inner.seen.lock().unwrap(), vec![CommandKind::Introspect]);
    }
}
