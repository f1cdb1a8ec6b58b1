//! Domain-specific errors for app operations

use hostapp_schema::{AppId, ManifestError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::io::extract::ExtractError;
use crate::storage::StorageError;

/// Errors raised by engine operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// A bundle's `manifest.json` is malformed.
    #[error("Failed to parse manifest {path}: {source}")]
    ManifestParse {
        /// Manifest file.
        path: PathBuf,
        /// Parse error.
        source: ManifestError,
    },

    /// The catalog refused a request.
    #[error("App retrieval failed - {0}")]
    RetrievalFailed(String),

    /// Removal refused because another installed app depends on the target.
    #[error("Cannot remove {target}, {blocker} depends on this app")]
    DependencyBlocked {
        /// App whose removal was requested.
        target: AppId,
        /// Installed app that depends on it.
        blocker: AppId,
    },

    /// No such app in the bundle store or catalog.
    #[error("App not found: {0}")]
    NotFound(AppId),

    /// An app id that does not name a single bundle directory.
    #[error("Invalid app id '{0}'")]
    InvalidId(String),

    /// A catalog request or subprocess exceeded its time limit.
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        /// What was running.
        operation: String,
        /// The limit that was exceeded.
        after: Duration,
    },

    /// An external program could not run or exited unsuccessfully.
    #[error("{program} failed: {message}")]
    Command {
        /// Program name.
        program: String,
        /// Its error output, or the spawn error.
        message: String,
    },

    /// A bundle archive could not be unpacked.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Transport failure talking to the catalog.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog response or stored value is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The list storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    pub(crate) fn command(program: &str, message: impl std::fmt::Display) -> Self {
        Self::Command {
            program: program.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result with [`AppError`] as the default error.
pub type Result<T, E = AppError> = std::result::Result<T, E>;
