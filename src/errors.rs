use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed:\n{}", bullet_list(.0))]
    Validation(Vec<String>),

    #[error("Unrecognized action: '{0}'")]
    UnrecognizedAction(String),

    #[error("Cannot resolve collections: {0}")]
    Resolution(String),

    #[error(
        "{tool} executable not found in PATH. \
         Please ensure the MongoDB database tools are installed and in your PATH."
    )]
    ToolNotFound { tool: String },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command exited with {status}: {stderr}")]
    Command {
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("Command timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, AppError>;

fn bullet_list(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("\t- {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
