use std::env;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// File name of the hearth config, both in `$HOME` and inside the repository
pub const CONFIG_FILE_NAME: &str = ".hearthrc";

/// Environment variable overriding the config path
pub const CONFIG_ENV: &str = "HEARTH_CONFIG";

/// Get the home directory
pub fn home_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|bd| bd.home_dir().to_path_buf())
        .ok_or(Error::NoHome)
}

/// Default repository location
///
/// Returns `$HOME/.hearth`
pub fn default_repository_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".hearth"))
}

/// Default config location
///
/// Returns `$HEARTH_CONFIG` if set, otherwise `$HOME/.hearthrc`
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(home_dir()?.join(CONFIG_FILE_NAME))
}

/// Expand a leading `~/` (or a bare `~`) to the home directory
pub fn expand_home(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return home_dir();
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(home_dir()?.join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

/// Collapse a path under the home directory back into `~/...` form
///
/// Used when storing install targets so the config stays portable across machines.
pub fn collapse_home(path: &Path) -> Result<String> {
    let home = home_dir()?;
    match path.strip_prefix(&home) {
        Ok(rest) if rest.as_os_str().is_empty() => Ok("~".to_string()),
        Ok(rest) => Ok(format!("~/{}", rest.display())),
        Err(_) => Ok(path.display().to_string()),
    }
}
