pub mod process;

use std::path::PathBuf;
use which::which;

use crate::errors::{AppError, Result};

/// Finds an import/export/shell executable in the system PATH.
pub fn find_executable(tool: &str) -> Result<PathBuf> {
    which(tool).map_err(|_| AppError::ToolNotFound {
        tool: tool.to_string(),
    })
}
