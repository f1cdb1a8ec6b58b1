//! App manager: the entry point tying the engine together.
//!
//! Install and remove on the same app id are serialized by a per-id lock;
//! operations on different ids may run concurrently and only contend on the
//! short transaction section inside [`installer::install`] and
//! [`remover::remove`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use hostapp_schema::{AppId, Manifest, Operation, PlanItem, VerificationReport};
use tokio::sync::OwnedMutexGuard;

use crate::backends::{Pacman, Pip, Systemd};
use crate::cache::CatalogCache;
use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::context::Context;
use crate::error::Result;
use crate::filter::AppFilter;
use crate::installer::{self, InstallOutcome};
use crate::planner::{execution_order, plan_cascade};
use crate::remover::{self, RemoveOutcome};
use crate::reporter::Reporter;
use crate::storage::{SqliteStorage, Storage};
use crate::store::BundleStore;

/// One async lock per app id, created on first use.
#[derive(Debug, Default)]
pub struct OpLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl OpLocks {
    /// Wait for exclusive access to `id`.
    pub async fn lock(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Facade over the catalog cache, planner, installer and remover.
#[derive(Debug)]
pub struct AppManager {
    ctx: Context,
    locks: OpLocks,
}

impl AppManager {
    /// Manager over an assembled context.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            locks: OpLocks::default(),
        }
    }

    /// Wire up the real backends, catalog client and storage from `config`.
    ///
    /// # Errors
    ///
    /// Fails when the bundle root or storage location cannot be resolved or
    /// opened, or the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = BundleStore::open(config.app_dir()?)?;
        let catalog = CatalogClient::new(config.catalog_url(), config.timeouts.catalog())?;
        let storage: Option<Arc<dyn Storage>> = match config.storage_path()? {
            Some(path) => Some(Arc::new(SqliteStorage::open(&path)?)),
            None => None,
        };
        tracing::debug!(
            "Bundle root {}, catalog {}",
            store.root().display(),
            catalog.url()
        );

        let cache = CatalogCache::new(store, Arc::new(catalog), storage);
        let timeout = config.timeouts.command();
        let backends = &config.backends;
        let ctx = Context::new(
            Arc::new(cache),
            Arc::new(Pacman::new(&backends.pacman, timeout)),
            Arc::new(Pip::new(&backends.pip, &backends.python, timeout)),
            Arc::new(Systemd::new(&backends.systemctl, timeout)),
        )
        .with_purge(config.apps.purge)
        .with_protected(config.apps.protected.iter().cloned());
        Ok(Self::new(ctx))
    }

    /// Report progress to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.ctx.reporter = reporter;
        self
    }

    /// The shared operation context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// The catalog cache.
    pub fn cache(&self) -> &CatalogCache {
        &self.ctx.cache
    }

    /// Installed apps, from the cache unless `reset`.
    ///
    /// # Errors
    ///
    /// See [`CatalogCache::list_installed`].
    pub async fn list_installed(&self, reset: bool, filter: &AppFilter) -> Result<Vec<Manifest>> {
        self.ctx.cache.list_installed(reset, filter).await
    }

    /// Catalog apps, from the cache unless `reset`.
    ///
    /// # Errors
    ///
    /// See [`CatalogCache::list_available`].
    pub async fn list_available(&self, reset: bool, filter: &AppFilter) -> Result<Vec<Manifest>> {
        self.ctx.cache.list_available(reset, filter).await
    }

    /// Installed apps with a different catalog version, from the cache unless `reset`.
    ///
    /// # Errors
    ///
    /// See [`CatalogCache::list_updateable`].
    pub async fn list_updateable(&self, reset: bool, filter: &AppFilter) -> Result<Vec<Manifest>> {
        self.ctx.cache.list_updateable(reset, filter).await
    }

    /// Extra actions implied by applying `op` to `id`. Nothing is executed.
    ///
    /// # Errors
    ///
    /// [`AppError::NotFound`](crate::AppError::NotFound) when installing an
    /// app the catalog does not list, or any list error.
    pub async fn plan(&self, id: &str, op: Operation) -> Result<Vec<PlanItem>> {
        let installed = self.list_installed(false, &AppFilter::none()).await?;
        let available = match op {
            Operation::Install => self.list_available(false, &AppFilter::none()).await?,
            Operation::Remove => Vec::new(),
        };
        plan_cascade(id, op, &installed, &available)
    }

    /// The cascade for `op` on `id`, ordered so it can be executed front to
    /// back before `id` itself. See [`execution_order`].
    ///
    /// # Errors
    ///
    /// See [`AppManager::plan`].
    pub async fn execution_plan(&self, id: &str, op: Operation) -> Result<Vec<PlanItem>> {
        let plan = self.plan(id, op).await?;
        let available = match op {
            Operation::Install => self.list_available(false, &AppFilter::none()).await?,
            Operation::Remove => Vec::new(),
        };
        Ok(execution_order(plan, &available))
    }

    /// Install `id`, optionally verifying its dependencies.
    ///
    /// # Errors
    ///
    /// See [`installer::install`].
    pub async fn install(&self, id: &str, verify: bool) -> Result<InstallOutcome> {
        let _guard = self.locks.lock(id).await;
        self.ctx.reporter.fetching(&AppId::new(id));
        installer::install(&self.ctx, id, verify).await
    }

    /// Remove `id`. See [`remover::remove`].
    ///
    /// # Errors
    ///
    /// See [`remover::remove`].
    pub async fn remove(&self, id: &str, force: bool) -> Result<RemoveOutcome> {
        let _guard = self.locks.lock(id).await;
        remover::remove(&self.ctx, id, force).await
    }

    /// Verify every installed app together and remember the results.
    ///
    /// # Errors
    ///
    /// The installed list cannot be read. Failed checks are part of the report.
    pub async fn verify_installed(&self) -> Result<VerificationReport> {
        let installed = self.list_installed(false, &AppFilter::none()).await?;
        for app in &installed {
            self.ctx.reporter.verifying(&app.pid);
        }
        let report = self.ctx.verifier().verify_all(&installed).await;
        self.ctx.cache.record_verification(&report);
        Ok(report)
    }

    /// Drop every cached list.
    ///
    /// # Errors
    ///
    /// The storage rejected the deletion.
    pub async fn reset(&self) -> Result<()> {
        self.ctx.cache.reset_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::StaticCatalog;
    use crate::installer::tests::{bundle, context, context_with_catalog};
    use crate::verifier::tests::FakePackages;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_is_serialized() {
        let locks = Arc::new(OpLocks::default());
        let guard = locks.lock("blog").await;

        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = other.lock("blog").await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        // A different id is not blocked.
        let _wiki = locks.lock("wiki").await;

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_plan_remove_through_manager() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), HashMap::new(), Arc::new(FakePackages::default()));
        let store = ctx.cache.store().clone();
        crate::store::tests::write_bundle(&store, "a", r#"{"pid": "a", "version": "1"}"#);
        crate::store::tests::write_bundle(
            &store,
            "b",
            r#"{"pid": "b", "version": "1", "dependencies": [{"type": "app", "package": "a"}]}"#,
        );
        let manager = AppManager::new(ctx);

        let plan = manager.plan("a", Operation::Remove).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].app_id(), "b");
    }

    #[tokio::test]
    async fn test_concurrent_installs_of_different_apps() {
        let dir = tempfile::tempdir().unwrap();
        let bundles = HashMap::from([
            (
                "blog".to_string(),
                bundle("blog", r#"{"pid": "blog", "version": "1.0"}"#),
            ),
            (
                "wiki".to_string(),
                bundle("wiki", r#"{"pid": "wiki", "version": "2.0"}"#),
            ),
        ]);
        let ctx = context(dir.path(), bundles, Arc::new(FakePackages::default()));
        let manager = AppManager::new(ctx);
        manager.list_installed(false, &AppFilter::none()).await.unwrap();

        let (a, b) = tokio::join!(manager.install("blog", false), manager.install("wiki", false));
        a.unwrap();
        b.unwrap();

        let installed = manager.list_installed(false, &AppFilter::none()).await.unwrap();
        assert_eq!(installed.len(), 2);

        let report = manager.verify_installed().await.unwrap();
        assert!(report.all_passed());
        assert_eq!(manager.cache().verification_status("wiki"), Some(true));
    }

    fn with_app_deps(pid: &str, deps: &[&str]) -> String {
        let deps: Vec<String> = deps
            .iter()
            .map(|d| format!(r#"{{"type": "app", "package": "{d}"}}"#))
            .collect();
        format!(
            r#"{{"pid": "{pid}", "version": "1.0", "dependencies": [{}]}}"#,
            deps.join(", ")
        )
    }

    #[tokio::test]
    async fn test_removal_cascade_executes_in_plan_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), HashMap::new(), Arc::new(FakePackages::default()));
        let store = ctx.cache.store().clone();
        // b depends on a and c; c depends on a.
        crate::store::tests::write_bundle(&store, "a", &with_app_deps("a", &[]));
        crate::store::tests::write_bundle(&store, "b", &with_app_deps("b", &["a", "c"]));
        crate::store::tests::write_bundle(&store, "c", &with_app_deps("c", &["a"]));
        let manager = AppManager::new(ctx);

        let plan = manager.execution_plan("a", Operation::Remove).await.unwrap();
        for item in &plan {
            manager.remove(item.app_id().as_str(), false).await.unwrap();
        }
        manager.remove("a", false).await.unwrap();

        assert!(manager.list_installed(false, &AppFilter::none()).await.unwrap().is_empty());
        for pid in ["a", "b", "c"] {
            assert!(!store.contains(pid));
        }
    }

    #[tokio::test]
    async fn test_install_cascade_executes_in_plan_order() {
        let dir = tempfile::tempdir().unwrap();
        // blog needs x and y; y needs x.
        let manifests = [
            ("blog", with_app_deps("blog", &["x", "y"])),
            ("x", with_app_deps("x", &[])),
            ("y", with_app_deps("y", &["x"])),
        ];
        let catalog = StaticCatalog {
            apps: manifests
                .iter()
                .map(|(_, json)| Manifest::from_json(json).unwrap())
                .collect(),
            bundles: manifests
                .iter()
                .map(|(pid, json)| ((*pid).to_string(), bundle(pid, json)))
                .collect(),
            ..Default::default()
        };
        let ctx = context_with_catalog(dir.path(), catalog, Arc::new(FakePackages::default()));
        let manager = AppManager::new(ctx);

        let plan = manager.execution_plan("blog", Operation::Install).await.unwrap();
        let order: Vec<&str> = plan.iter().map(|i| i.app_id().as_str()).collect();
        assert_eq!(order, vec!["x", "y"]);

        for item in &plan {
            let outcome = manager.install(item.app_id().as_str(), true).await.unwrap();
            assert!(outcome.is_ready(), "{} did not verify", outcome.manifest.pid);
        }
        let outcome = manager.install("blog", true).await.unwrap();
        assert!(outcome.is_ready());
    }
}
