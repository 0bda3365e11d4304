// mongomigrate/src/config/mod.rs
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::cli::Cli;
use crate::errors::{AppError, Result};
use crate::migrate::command::is_single_file_source;

pub const DEFAULT_CONFIG_FILE: &str = "mongomigrate.json";
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_EXPORT_TOOL: &str = "mongoexport";
const DEFAULT_IMPORT_TOOL: &str = "mongoimport";
const DEFAULT_SHELL_TOOL: &str = "mongo";

// Structs for deserializing mongomigrate.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonToolsConfig {
    pub export: Option<String>,
    pub import: Option<String>,
    pub shell: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub database: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub uri: Option<String>,
    pub collections: Option<serde_json::Value>,
    pub output: Option<String>,
    pub from: Option<String>,
    pub timeout_secs: Option<u64>,
    pub tools: Option<JsonToolsConfig>,
}

impl RawJsonConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)?;
        let raw: RawJsonConfig = serde_json::from_str(&config_content)?;
        debug!("Loaded configuration file {}", config_path.display());
        Ok(raw)
    }

    /// Loads the explicit config file, or the default one when it exists in the working directory.
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>> {
        match explicit {
            Some(path) => Self::load_from_json(path).map(Some),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load_from_json(default_path).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Export,
    Import,
}

impl ActionKind {
    pub fn parse(choice: &str) -> Result<Self> {
        match choice.trim().to_lowercase().as_str() {
            "1" | "export" => Ok(ActionKind::Export),
            "2" | "import" => Ok(ActionKind::Import),
            other => Err(AppError::UnrecognizedAction(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Export => "export",
            ActionKind::Import => "import",
        }
    }
}

/// The validated action together with the location it reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Export { output: String },
    Import { from: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Export { .. } => ActionKind::Export,
            Action::Import { .. } => ActionKind::Import,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            Action::Export { output } => output,
            Action::Import { from } => from,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsConfig {
    pub export: String,
    pub import: String,
    pub shell: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        ToolsConfig {
            export: DEFAULT_EXPORT_TOOL.to_string(),
            import: DEFAULT_IMPORT_TOOL.to_string(),
            shell: DEFAULT_SHELL_TOOL.to_string(),
        }
    }
}

impl ToolsConfig {
    pub fn for_action(&self, kind: ActionKind) -> &str {
        match kind {
            ActionKind::Export => &self.export,
            ActionKind::Import => &self.import,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    pub action: Action,
    pub connection: ConnectionParams,
    /// Empty means "resolve automatically".
    pub collections: Vec<String>,
    pub tools: ToolsConfig,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub options: MigrationOptions,
    pub dry_run: bool,
    pub report_path: Option<PathBuf>,
}

/// Options merged from every source, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub action: Option<ActionKind>,
    pub database: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub collections: Vec<String>,
    pub output: Option<String>,
    pub from: Option<String>,
    pub tools: ToolsConfig,
    pub timeout_secs: Option<u64>,
}

impl RawOptions {
    /// Layers CLI (and env, through clap) over the JSON file, then fills gaps from the URI.
    pub fn from_sources(
        cli: &Cli,
        file: Option<RawJsonConfig>,
        action: Option<ActionKind>,
    ) -> Result<Self> {
        let file = file.unwrap_or_default();
        let file_collections = parse_collection_list(&file.collections)?.unwrap_or_default();
        let file_tools = file.tools.unwrap_or_default();
        let defaults = ToolsConfig::default();

        let mut raw = RawOptions {
            action,
            database: non_empty(cli.database.clone()).or(non_empty(file.database)),
            host: non_empty(cli.host.clone()).or(non_empty(file.host)),
            port: cli.port.or(file.port),
            user: non_empty(cli.user.clone()).or(non_empty(file.user)),
            password: non_empty(cli.password.clone()).or(non_empty(file.password)),
            collections: match &cli.collections {
                Some(list) => normalize_collections(list.clone()),
                None => file_collections,
            },
            output: non_empty(cli.output.clone()).or(non_empty(file.output)),
            from: non_empty(cli.from.clone()).or(non_empty(file.from)),
            tools: ToolsConfig {
                export: non_empty(file_tools.export).unwrap_or(defaults.export),
                import: non_empty(file_tools.import).unwrap_or(defaults.import),
                shell: non_empty(file_tools.shell).unwrap_or(defaults.shell),
            },
            timeout_secs: cli.timeout.or(file.timeout_secs),
        };

        if let Some(uri) = non_empty(cli.uri.clone()).or(non_empty(file.uri)) {
            raw.apply_uri(&uri)?;
        }

        Ok(raw)
    }

    /// Fills host, port, credentials and database from a `mongodb://` URI where still unset.
    pub fn apply_uri(&mut self, uri: &str) -> Result<()> {
        let parsed = Url::parse(uri)?;

        if self.host.is_none() {
            self.host = parsed.host_str().map(str::to_string);
        }
        if self.port.is_none() {
            self.port = parsed.port();
        }
        if self.user.is_none() && !parsed.username().is_empty() {
            self.user = Some(decode_credential(parsed.username())?);
        }
        if self.password.is_none() {
            self.password = parsed.password().map(decode_credential).transpose()?;
        }
        if self.database.is_none() {
            let path = parsed.path().trim_start_matches('/');
            if !path.is_empty() {
                self.database = Some(path.to_string());
            }
        }
        Ok(())
    }

    /// Checks required info, collecting every problem before anything runs.
    pub fn validate(self) -> Result<MigrationOptions> {
        let mut validation_errors = Vec::new();

        if self.action.is_none() {
            validation_errors.push("No action specified".to_string());
        }
        if self.database.is_none() {
            validation_errors.push("No database specified".to_string());
        }

        let action = match self.action {
            Some(ActionKind::Export) => match &self.output {
                Some(output) => Some(Action::Export { output: output.clone() }),
                None => {
                    validation_errors.push("No output directory specified".to_string());
                    None
                }
            },
            Some(ActionKind::Import) => match &self.from {
                None => {
                    validation_errors.push("No import directory or file specified".to_string());
                    None
                }
                Some(from) if !Path::new(from).exists() => {
                    validation_errors.push(format!("Import source '{}' does not exist", from));
                    None
                }
                Some(from) if !Path::new(from).is_dir() && !is_single_file_source(from) => {
                    validation_errors.push(format!(
                        "Import source '{}' must be a directory or a .json file",
                        from
                    ));
                    None
                }
                Some(from) => Some(Action::Import { from: from.clone() }),
            },
            None => None,
        };

        let (Some(action), Some(database), true) =
            (action, self.database, validation_errors.is_empty())
        else {
            return Err(AppError::Validation(validation_errors));
        };

        let password = match (&self.user, self.password) {
            (None, Some(_)) => {
                warn!("A password was given without a user; it will not be used");
                None
            }
            (_, password) => password,
        };

        let collections = match action {
            Action::Export { .. } => self.collections,
            Action::Import { .. } => {
                if !self.collections.is_empty() {
                    warn!("Collection list is ignored on import; the source path decides");
                }
                Vec::new()
            }
        };

        Ok(MigrationOptions {
            action,
            connection: ConnectionParams {
                host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: self.port,
                user: self.user,
                password,
                database,
            },
            collections,
            tools: self.tools,
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// URI userinfo stays percent-encoded after parsing.
fn decode_credential(encoded: &str) -> Result<String> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| {
            AppError::Validation(vec![
                "URI credentials are not valid UTF-8 once percent-decoded".to_string(),
            ])
        })
}

fn normalize_collections(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses the `collections` entry of the config file.
/// Accepts either an array of names or a single comma-joined string.
fn parse_collection_list(collections: &Option<serde_json::Value>) -> Result<Option<Vec<String>>> {
    match collections {
        Some(serde_json::Value::String(joined)) => Ok(Some(normalize_collections(
            joined.split(',').map(str::to_string).collect(),
        ))),
        Some(value) if value.is_array() => {
            let list: Vec<String> = serde_json::from_value(value.clone())?;
            Ok(Some(normalize_collections(list)))
        }
        Some(_) => Err(AppError::Validation(vec![
            "collections must be either an array of collection names or a comma separated string"
                .to_string(),
        ])),
        None => Ok(None),
    }
}
