// mongomigrate/src/migrate/resolver.rs
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::{Action, MigrationOptions};
use crate::errors::{AppError, Result};
use crate::migrate::command::{build_introspection_command, is_single_file_source};
use crate::utils::process::ProcessRunner;

/// Determines the ordered working set of collections for one run.
pub async fn resolve_collections<R: ProcessRunner + ?Sized>(
    options: &MigrationOptions,
    runner: &R,
) -> Result<Vec<String>> {
    match &options.action {
        Action::Export { .. } if !options.collections.is_empty() => Ok(options.collections.clone()),
        Action::Export { .. } => {
            info!(
                "No collections specified, fetching all collections of '{}'...",
                options.connection.database
            );
            fetch_collection_names(options, runner).await
        }
        Action::Import { from } if is_single_file_source(from) => {
            let name = collection_name_from_file(Path::new(from)).ok_or_else(|| {
                AppError::Resolution(format!("Cannot derive a collection name from '{}'", from))
            })?;
            Ok(vec![name])
        }
        Action::Import { from } => collections_from_directory(Path::new(from)),
    }
}

async fn fetch_collection_names<R: ProcessRunner + ?Sized>(
    options: &MigrationOptions,
    runner: &R,
) -> Result<Vec<String>> {
    let command = build_introspection_command(&options.connection, &options.tools);
    debug!("Listing collections with: {}", command.redacted());

    let output = runner.run(&command).await;
    if let Some(err) = output.error {
        return Err(AppError::Resolution(format!(
            "Cannot get collection names from database. ERROR: {}",
            err
        )));
    }

    let names = parse_collection_names(&output.stdout);
    info!("Found collections: {:?}", names);
    Ok(names)
}

/// Parses the shell's comma-joined answer. Banner lines, if any, precede it,
/// so only the last non-empty line is taken.
pub fn parse_collection_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(|line| {
            line.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// The collection a `.json` artifact belongs to: its file name up to the first `.`.
pub fn collection_name_from_file(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_string_lossy();
    file_name
        .split('.')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Lists `*.json` files directly inside `dir`, sorted by file name.
pub fn collections_from_directory(dir: &Path) -> Result<Vec<String>> {
    let mut collections = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            AppError::Resolution(format!("Failed to list directory {}: {}", dir.display(), e))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(".json") {
            debug!("Skipping non-JSON entry {}", entry.path().display());
            continue;
        }
        if let Some(name) = collection_name_from_file(entry.path()) {
            collections.push(name);
        }
    }

    info!("Found {} collection files in {}", collections.len(), dir.display());
    Ok(collections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionParams, ToolsConfig};
    use crate::migrate::command::{CommandKind, MigrationCommand};
    use crate::utils::process::ProcessOutput;
    use async_trait::async_trait;
    use std::fs;

    struct IntrospectionRunner {
        answer: std::result::Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl ProcessRunner for IntrospectionRunner {
        async fn run(&self, command: &MigrationCommand) -> ProcessOutput {
            assert_eq!(command.kind, CommandKind::Introspect);
            match self.answer {
                Ok(stdout) => ProcessOutput::success(stdout),
                Err(stderr) => ProcessOutput::failure(AppError::Command {
                    status: "exit status: 1".to_string(),
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                }),
            }
        }
    }

    fn options(action: Action, collections: &[&str]) -> MigrationOptions {
        MigrationOptions {
            action,
            connection: ConnectionParams {
                host: "localhost".to_string(),
                port: None,
                user: None,
                password: None,
                database: "shop".to_string(),
            },
            collections: collections.iter().map(|c| c.to_string()).collect(),
            tools: ToolsConfig::default(),
            timeout: None,
        }
    }

    fn export() -> Action {
        Action::Export {
            output: "out".to_string(),
        }
    }

    #[tokio::test]
    async fn test_explicit_list_is_kept_in_order() -> anyhow::Result<()> {
        let runner = IntrospectionRunner { answer: Err("should not run") };
        let resolved = resolve_collections(&options(export(), &["b", "a", "b"]), &runner).await?;
        assert_eq!(resolved, vec!["b", "a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_export_without_list_uses_introspection() -> anyhow::Result<()> {
        let runner = IntrospectionRunner {
            answer: Ok("users,orders,invoices\n"),
        };
        let resolved = resolve_collections(&options(export(), &[]), &runner).await?;
        assert_eq!(resolved, parse_collection_names("users,orders,invoices"));
        assert_eq!(resolved, vec!["users", "orders", "invoices"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_introspection_failure_is_fatal() {
        let runner = IntrospectionRunner {
            answer: Err("auth failed"),
        };
        let result = resolve_collections(&options(export(), &[]), &runner).await;
        assert!(matches!(result, Err(AppError::Resolution(msg)) if msg.contains("auth failed")));
    }

    #[test]
    fn test_parse_collection_names_skips_banner() {
        let stdout = "MongoDB shell version v4.4.6\r\n\
                      connecting to: mongodb://localhost:27017/shop\r\n\
                      users,orders\r\n";
        assert_eq!(parse_collection_names(stdout), vec!["users", "orders"]);
        assert!(parse_collection_names("\n").is_empty());
    }

    #[tokio::test]
    async fn test_import_single_file() -> anyhow::Result<()> {
        let runner = IntrospectionRunner { answer: Err("should not run") };
        let action = Action::Import {
            from: "foo/bar.json".to_string(),
        };
        let resolved = resolve_collections(&options(action, &[]), &runner).await?;
        assert_eq!(resolved, vec!["bar"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_directory_keeps_only_json_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        for name in ["a.json", "b.json", "c.txt", "d.json.bak"] {
            fs::write(dir.path().join(name), "{}")?;
        }
        fs::create_dir(dir.path().join("nested.json"))?;

        let runner = IntrospectionRunner { answer: Err("should not run") };
        let action = Action::Import {
            from: dir.path().to_string_lossy().to_string(),
        };
        let resolved = resolve_collections(&options(action, &[]), &runner).await?;
        assert_eq!(resolved, vec!["a", "b"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_directory_with_json_suffix_is_scanned() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let backup = dir.path().join("backup.json");
        fs::create_dir(&backup)?;
        fs::write(backup.join("a.json"), "{}")?;
        fs::write(backup.join("b.json"), "{}")?;

        let runner = IntrospectionRunner { answer: Err("should not run") };
        let action = Action::Import {
            from: backup.to_string_lossy().to_string(),
        };
        let resolved = resolve_collections(&options(action, &[]), &runner).await?;
        assert_eq!(resolved, vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn test_collection_name_from_file() {
        assert_eq!(
            collection_name_from_file(Path::new("dump/users.2024.json")),
            Some("users".to_string())
        );
        assert_eq!(collection_name_from_file(Path::new("dump/.json")), None);
    }
}
