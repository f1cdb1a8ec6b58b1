//! Shared operation context.
//!
//! Groups the collaborators that install and remove need, so they can be
//! assembled once (from configuration, or from fakes in tests) and passed
//! around by reference.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backends::{RuntimePackages, ServiceManager, SystemPackages};
use crate::cache::CatalogCache;
use crate::config::DEFAULT_PROTECTED;
use crate::reporter::{NullReporter, Reporter};
use crate::verifier::Verifier;

/// Groups common state used by install and remove.
#[derive(Clone)]
pub struct Context {
    /// App lists and the bundle store.
    pub cache: Arc<CatalogCache>,
    /// Native package manager.
    pub system: Arc<dyn SystemPackages>,
    /// Runtime package manager.
    pub runtime: Arc<dyn RuntimePackages>,
    /// Service manager for daemons of removed packages.
    pub services: Arc<dyn ServiceManager>,
    /// Progress sink, silent by default.
    pub reporter: Arc<dyn Reporter>,
    /// Remove residual configuration along with uninstalled system packages.
    pub purge: bool,
    /// System packages that are never uninstalled.
    pub protected: BTreeSet<String>,
    /// Serializes the snapshot-and-mutate sections of install and remove.
    pub transaction: Arc<Mutex<()>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cache", &self.cache)
            .field("purge", &self.purge)
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Context with the default protected packages, no purge and a silent reporter.
    pub fn new(
        cache: Arc<CatalogCache>,
        system: Arc<dyn SystemPackages>,
        runtime: Arc<dyn RuntimePackages>,
        services: Arc<dyn ServiceManager>,
    ) -> Self {
        Self {
            cache,
            system,
            runtime,
            services,
            reporter: Arc::new(NullReporter),
            purge: false,
            protected: DEFAULT_PROTECTED.iter().map(ToString::to_string).collect(),
            transaction: Arc::new(Mutex::new(())),
        }
    }

    /// Report progress to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Purge configuration when uninstalling system packages.
    pub fn with_purge(mut self, purge: bool) -> Self {
        self.purge = purge;
        self
    }

    /// Replace the protected package set.
    pub fn with_protected<I, S>(mut self, protected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected = protected.into_iter().map(Into::into).collect();
        self
    }

    /// A verifier driving this context's package managers.
    pub fn verifier(&self) -> Verifier {
        Verifier::new(Arc::clone(&self.system), Arc::clone(&self.runtime))
    }
}
