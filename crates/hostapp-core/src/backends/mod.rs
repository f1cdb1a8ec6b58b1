//! Adapters for the external managers the engine drives.
//!
//! The traits are object-safe (`async_trait`) so the manager can hold
//! `Arc<dyn SystemPackages>` and tests can substitute in-process fakes.

use async_trait::async_trait;

use crate::error::Result;

pub mod pacman;
pub mod pip;
pub mod systemd;

pub use pacman::Pacman;
pub use pip::Pip;
pub use systemd::Systemd;

/// Native OS package manager.
#[async_trait]
pub trait SystemPackages: Send + Sync + std::fmt::Debug {
    /// Whether `name` is installed.
    ///
    /// # Errors
    ///
    /// The package query could not run.
    async fn is_installed(&self, name: &str) -> Result<bool>;

    /// Install `names`, refreshing the package database first when `refresh` is set.
    ///
    /// # Errors
    ///
    /// The package manager failed or timed out.
    async fn install(&self, names: &[String], refresh: bool) -> Result<()>;

    /// Uninstall `names`; `purge` also removes residual configuration.
    ///
    /// # Errors
    ///
    /// The package manager failed or timed out.
    async fn remove(&self, names: &[String], purge: bool) -> Result<()>;

    /// Whether `binary` resolves on `PATH`.
    fn has_binary(&self, binary: &str) -> bool {
        which::which(binary).is_ok()
    }
}

/// Language-runtime package manager.
#[async_trait]
pub trait RuntimePackages: Send + Sync + std::fmt::Debug {
    /// Whether `name` is registered as installed.
    ///
    /// # Errors
    ///
    /// The package query could not run.
    async fn is_installed(&self, name: &str) -> Result<bool>;

    /// Install `names`.
    ///
    /// # Errors
    ///
    /// The package manager failed or timed out.
    async fn install(&self, names: &[String]) -> Result<()>;

    /// Whether `module` can be imported by the runtime.
    async fn can_import(&self, module: &str) -> bool;
}

/// Host service manager.
#[async_trait]
pub trait ServiceManager: Send + Sync + std::fmt::Debug {
    /// Start the service `name` now.
    ///
    /// # Errors
    ///
    /// The service manager failed or timed out.
    async fn start(&self, name: &str) -> Result<()>;
    /// Stop the running service `name`.
    ///
    /// # Errors
    ///
    /// The service manager failed or timed out.
    async fn stop(&self, name: &str) -> Result<()>;
    /// Start `name` at boot.
    ///
    /// # Errors
    ///
    /// The service manager failed or timed out.
    async fn enable(&self, name: &str) -> Result<()>;
    /// No longer start `name` at boot.
    ///
    /// # Errors
    ///
    /// The service manager failed or timed out.
    async fn disable(&self, name: &str) -> Result<()>;
}
