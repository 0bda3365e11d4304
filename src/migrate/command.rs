// mongomigrate/src/migrate/command.rs
use std::fmt;
use std::path::Path;

use crate::config::{Action, ConnectionParams, ToolsConfig};

const JSON_EXTENSION: &str = ".json";
const PASSWORD_MASK: &str = "****";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Export,
    Import,
    Introspect,
}

/// One external invocation: a program and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationCommand {
    pub kind: CommandKind,
    pub program: String,
    pub args: Vec<String>,
    password_index: Option<usize>,
}

impl MigrationCommand {
    pub fn new(kind: CommandKind, program: impl Into<String>, args: Vec<String>) -> Self {
        MigrationCommand {
            kind,
            program: program.into(),
            args,
            password_index: None,
        }
    }

    /// The command line with the password argument masked, for logs and reports.
    pub fn redacted(&self) -> String {
        self.render(true)
    }

    fn push(&mut self, flag: &str, value: &str) {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
    }

    fn push_credentials(&mut self, connection: &ConnectionParams) {
        if let Some(user) = &connection.user {
            self.push("-u", user);

            if let Some(password) = &connection.password {
                self.push("-p", password);
                self.password_index = Some(self.args.len() - 1);
            }
        }
    }

    fn render(&self, mask_password: bool) -> String {
        let mut line = self.program.clone();
        for (i, arg) in self.args.iter().enumerate() {
            line.push(' ');
            if mask_password && Some(i) == self.password_index {
                line.push_str(PASSWORD_MASK);
            } else if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("\"{}\"", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for MigrationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

fn host_with_port(connection: &ConnectionParams) -> String {
    match connection.port {
        Some(port) => format!("{}:{}", connection.host, port),
        None => connection.host.clone(),
    }
}

fn is_json_file(path: &str) -> bool {
    path.ends_with(JSON_EXTENSION)
}

/// Whether an import source names one `.json` file rather than a directory of them.
/// A directory whose name ends in `.json` is still a directory.
pub fn is_single_file_source(from: &str) -> bool {
    is_json_file(from) && !Path::new(from).is_dir()
}

/// Where one collection is written on export.
///
/// A directory gets `<dir>/<collection>.json`; a single `.json` target is fanned
/// out to `<stem>_<collection>.json` next to it.
pub fn export_destination(output: &str, collection: &str) -> String {
    match output.strip_suffix(JSON_EXTENSION) {
        Some(stem) => format!("{}_{}{}", stem, collection, JSON_EXTENSION),
        None => format!("{}/{}{}", output.trim_end_matches('/'), collection, JSON_EXTENSION),
    }
}

/// Where one collection is read from on import.
pub fn import_source(from: &str, collection: &str) -> String {
    if is_single_file_source(from) {
        from.to_string()
    } else {
        format!("{}/{}{}", from.trim_end_matches('/'), collection, JSON_EXTENSION)
    }
}

/// Builds the import/export invocation for one collection.
///
/// Returns `None` for a blank collection name, which the engine skips.
pub fn build_command(
    action: &Action,
    connection: &ConnectionParams,
    tools: &ToolsConfig,
    collection: &str,
) -> Option<MigrationCommand> {
    if collection.trim().is_empty() {
        return None;
    }

    let (kind, program) = match action {
        Action::Export { .. } => (CommandKind::Export, &tools.export),
        Action::Import { .. } => (CommandKind::Import, &tools.import),
    };

    let mut command = MigrationCommand::new(kind, program, Vec::new());
    command.push("--host", &host_with_port(connection));
    command.push_credentials(connection);
    command.push("-d", &connection.database);
    command.push("-c", collection);

    match action {
        Action::Export { output } => command.push("-o", &export_destination(output, collection)),
        Action::Import { from } => command.args.push(import_source(from, collection)),
    }

    Some(command)
}

/// Builds the shell call that prints the database's collection names, comma-joined.
pub fn build_introspection_command(
    connection: &ConnectionParams,
    tools: &ToolsConfig,
) -> MigrationCommand {
    let mut command = MigrationCommand::new(
        CommandKind::Introspect,
        &tools.shell,
        vec![
            "--quiet".to_string(),
            format!("{}/{}", host_with_port(connection), connection.database),
        ],
    );
    command.push_credentials(connection);
    command.push("--eval", "db.getCollectionNames().join()");
    command
}
