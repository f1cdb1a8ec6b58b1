//! Engine for installing, verifying and removing host applications.
//!
//! [`AppManager`] is the entry point. It combines the [`CatalogCache`], the
//! dependency [`Verifier`], the cascade [`planner`], and the [`installer`] and
//! [`remover`] transactions over the collaborators in [`backends`].

pub mod backends;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod installer;
pub mod io;
pub mod manager;
pub mod paths;
pub mod planner;
pub mod remover;
pub mod storage;
pub mod store;
pub mod verifier;

pub mod reporter;

pub use cache::CatalogCache;
pub use catalog::{Catalog, CatalogClient};
pub use config::Config;
pub use context::Context;
pub use error::{AppError, Result};
pub use filter::AppFilter;
pub use installer::InstallOutcome;
pub use manager::{AppManager, OpLocks};
pub use paths::*;
pub use remover::RemoveOutcome;
pub use reporter::{NullReporter, Reporter};
pub use verifier::{StageResult, Verifier};

/// User Agent string for catalog requests
pub const USER_AGENT: &str = concat!("hostapp-core/", env!("CARGO_PKG_VERSION"));
