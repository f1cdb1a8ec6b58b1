//! Well-known locations under the hostapp home directory.

use dirs::home_dir;
use std::path::PathBuf;

/// Returns the hostapp home directory, or None if the user's home cannot be resolved.
///
/// `HOSTAPP_HOME` overrides the default of `~/.hostapp`.
pub fn try_hostapp_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("HOSTAPP_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".hostapp"))
}

/// Configuration file: ~/.hostapp/config.toml
pub fn config_path() -> Option<PathBuf> {
    try_hostapp_home().map(|h| h.join("config.toml"))
}

/// `SQLite` list storage: ~/.hostapp/state.db
pub fn db_path() -> Option<PathBuf> {
    try_hostapp_home().map(|h| h.join("state.db"))
}

/// Default bundle store: ~/.hostapp/apps
pub fn apps_path() -> Option<PathBuf> {
    try_hostapp_home().map(|h| h.join("apps"))
}
