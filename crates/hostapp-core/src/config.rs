//! Configuration loaded from `config.toml`.
//!
//! Every section is optional; a missing file yields [`Config::default`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Core platform packages that are never removed automatically.
pub const DEFAULT_PROTECTED: &[&str] = &["openssl", "openssh", "nginx", "python2", "redis"];

/// Failure to load the configuration or resolve its default paths.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// No home directory to place default paths under.
    #[error("Could not determine home directory. Set HOSTAPP_HOME to override.")]
    NoHome,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[general]`
    pub general: GeneralConfig,
    /// `[apps]`
    pub apps: AppsConfig,
    /// `[storage]`
    pub storage: StorageConfig,
    /// `[timeouts]`
    pub timeouts: TimeoutConfig,
    /// `[backends]`
    pub backends: BackendConfig,
}

/// `[general]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Catalog host name. A value with a scheme is used as the full URL.
    pub repo_server: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            repo_server: "apps.hostapp.dev".to_string(),
        }
    }
}

/// `[apps]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppsConfig {
    /// Bundle store root. Defaults to `$HOSTAPP_HOME/apps`.
    pub app_dir: Option<PathBuf>,
    /// Remove residual configuration when uninstalling system packages.
    pub purge: bool,
    /// System packages that removal never uninstalls.
    pub protected: Vec<String>,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            app_dir: None,
            purge: false,
            protected: DEFAULT_PROTECTED.iter().map(ToString::to_string).collect(),
        }
    }
}

/// `[storage]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Persist cached lists. When false every read rescans or refetches.
    pub enabled: bool,
    /// Database path. Defaults to `$HOSTAPP_HOME/state.db`.
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

/// `[timeouts]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Limit for one catalog request.
    pub catalog_secs: u64,
    /// Limit for one package manager or service manager call.
    pub command_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            catalog_secs: 30,
            command_secs: 600,
        }
    }
}

impl TimeoutConfig {
    /// `catalog_secs` as a [`Duration`].
    pub fn catalog(&self) -> Duration {
        Duration::from_secs(self.catalog_secs)
    }

    /// `command_secs` as a [`Duration`].
    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }
}

/// `[backends]` - executable names for the external package and service managers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Native package manager.
    pub pacman: String,
    /// Runtime package manager.
    pub pip: String,
    /// Interpreter used to probe importable modules.
    pub python: String,
    /// Service manager.
    pub systemctl: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            pacman: "pacman".to_string(),
            pip: "pip".to_string(),
            python: "python".to_string(),
            systemctl: "systemctl".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] when the file cannot be read, [`ConfigError::Parse`] when it is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `$HOSTAPP_HOME/config.toml`.
    ///
    /// # Errors
    ///
    /// See [`Config::load`]; also [`ConfigError::NoHome`].
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = crate::paths::config_path().ok_or(ConfigError::NoHome)?;
        Self::load(&path)
    }

    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// The text is not valid TOML or has unknown keys.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Base URL of the remote catalog.
    pub fn catalog_url(&self) -> String {
        let server = self.general.repo_server.trim_end_matches('/');
        if server.contains("://") {
            format!("{server}/")
        } else {
            format!("https://{server}/")
        }
    }

    /// Resolved bundle store root.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoHome`] when no directory is configured and there is no home.
    pub fn app_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.apps.app_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::paths::apps_path().ok_or(ConfigError::NoHome),
        }
    }

    /// Resolved storage database path, or `None` when storage is disabled.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoHome`] when no path is configured and there is no home.
    pub fn storage_path(&self) -> Result<Option<PathBuf>, ConfigError> {
        if !self.storage.enabled {
            return Ok(None);
        }
        match &self.storage.path {
            Some(path) => Ok(Some(path.clone())),
            None => crate::paths::db_path().map(Some).ok_or(ConfigError::NoHome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::parse("").unwrap();
        assert!(!cfg.apps.purge);
        assert!(cfg.apps.protected.contains(&"nginx".to_string()));
        assert_eq!(cfg.timeouts.catalog(), Duration::from_secs(30));
        assert_eq!(cfg.catalog_url(), "https://apps.hostapp.dev/");
    }

    #[test]
    fn test_full_file() {
        let cfg = Config::parse(
            r#"
            [general]
            repo_server = "http://127.0.0.1:8080"

            [apps]
            app_dir = "/srv/apps"
            purge = true
            protected = ["openssl"]

            [storage]
            enabled = false

            [timeouts]
            command_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.catalog_url(), "http://127.0.0.1:8080/");
        assert_eq!(cfg.app_dir().unwrap(), PathBuf::from("/srv/apps"));
        assert!(cfg.apps.purge);
        assert_eq!(cfg.apps.protected, vec!["openssl"]);
        assert_eq!(cfg.storage_path().unwrap(), None);
        assert_eq!(cfg.timeouts.command(), Duration::from_secs(5));
        assert_eq!(cfg.backends.pacman, "pacman");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::parse("[apps]\npurg = true\n").unwrap_err();
        assert!(err.to_string().contains("purg"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.general.repo_server, "apps.hostapp.dev");
    }
}
