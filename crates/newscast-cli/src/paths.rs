//! Data directory resolution.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "NEWSCAST_DATA_DIR";

/// File holding the persisted key-value document.
pub const STATE_FILE: &str = "state.json";

/// Settings file picked up from the data directory when `--config` is absent.
pub const SETTINGS_FILE: &str = "settings.json";

/// Resolve the data directory.
///
/// Resolution order:
/// 1. `--data-dir` flag
/// 2. `NEWSCAST_DATA_DIR` environment variable
/// 3. System data directory (e.g., `~/.local/share/newscast`)
pub fn resolve_data_dir(flag: Option<&Path>) -> Result<PathBuf, CliError> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    dirs::data_dir()
        .map(|dir| dir.join("newscast"))
        .ok_or_else(|| CliError::Config("no data directory available on this platform".into()))
}
