//! Config file location.
//!
//! Default is `<config_dir>/tvctl/config.toml`; `~` in an explicit path
//! expands to the home directory.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{Result, TvError};

/// File name inside the per-user config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name.
pub const APP_DIR_NAME: &str = "tvctl";

/// Resolve the config file to read.
///
/// An explicit path wins (with `~` expanded); otherwise the platform config
/// directory is used.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let resolved = expand_home(path)?;
        debug!(path = %resolved.display(), "Using explicit config path");
        return Ok(resolved);
    }
    default_config_path()
}

/// `<config_dir>/tvctl/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().ok_or_else(|| {
        TvError::Config("Could not determine the user config directory".to_string())
    })?;
    Ok(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    trace!(path = %path.display(), "Expanding path");

    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let rest = path_str.strip_prefix("~/").unwrap_or("");
        return Ok(if rest.is_empty() {
            home
        } else {
            home.join(rest)
        });
    }
    Ok(path.to_path_buf())
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| TvError::Config("Could not determine home directory".to_string()))
}
