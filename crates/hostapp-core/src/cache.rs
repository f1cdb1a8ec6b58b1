//! Catalog cache: the installed, available and updateable app lists.
//!
//! # Consistency
//!
//! Reads return the last successful scan or fetch. A miss (or `reset`)
//! rebuilds the list wholesale and replaces the stored copy in one storage
//! call. Rebuilds and the installer/remover mutations are serialized behind a
//! single async lock so no caller can observe a list halfway through a reset.
//! Without storage, every read rescans the bundle store or refetches the
//! catalog.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use hostapp_schema::{Manifest, VerificationReport};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::error::Result;
use crate::filter::AppFilter;
use crate::storage::{AVAILABLE_KEY, INSTALLED_KEY, Storage, StorageError, UPDATEABLE_KEY};
use crate::store::BundleStore;

/// Cached view of installed, available and updateable apps.
#[derive(Debug)]
pub struct CatalogCache {
    store: BundleStore,
    catalog: Arc<dyn Catalog>,
    storage: Option<Arc<dyn Storage>>,
    lock: Mutex<()>,
    verified: RwLock<HashMap<String, bool>>,
}

/// Available entries that share a pid with an installed entry but differ in version.
///
/// The first installed match decides; versions are never ordered, so a
/// "downgrade" counts as an update too.
pub fn compute_updateable(available: &[Manifest], installed: &[Manifest]) -> Vec<Manifest> {
    available
        .iter()
        .filter(|x| {
            installed
                .iter()
                .find(|y| y.pid == x.pid)
                .is_some_and(|y| y.version != x.version)
        })
        .cloned()
        .collect()
}

impl CatalogCache {
    /// Cache over `store` and `catalog`. Without `storage` nothing is cached.
    pub fn new(
        store: BundleStore,
        catalog: Arc<dyn Catalog>,
        storage: Option<Arc<dyn Storage>>,
    ) -> Self {
        Self {
            store,
            catalog,
            storage,
            lock: Mutex::new(()),
            verified: RwLock::new(HashMap::new()),
        }
    }

    /// The bundle store the installed list is scanned from.
    pub fn store(&self) -> &BundleStore {
        &self.store
    }

    /// The remote catalog the available list is fetched from.
    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Installed apps, rescanning the bundle store on a miss or `reset`.
    ///
    /// # Errors
    ///
    /// Scanning the bundle root or writing the stored list failed.
    pub async fn list_installed(&self, reset: bool, filter: &AppFilter) -> Result<Vec<Manifest>> {
        let _guard = self.lock.lock().await;
        Ok(filter.apply(self.installed_locked(reset)?))
    }

    /// Available apps, refetching the catalog on a miss or `reset`.
    ///
    /// # Errors
    ///
    /// A failed catalog fetch is returned as-is; it is never retried.
    pub async fn list_available(&self, reset: bool, filter: &AppFilter) -> Result<Vec<Manifest>> {
        let _guard = self.lock.lock().await;
        Ok(filter.apply(self.available_locked(reset).await?))
    }

    /// Updateable apps, recomputed from the (cached) installed and available lists.
    ///
    /// # Errors
    ///
    /// Any error of the installed or available list.
    pub async fn list_updateable(&self, reset: bool, filter: &AppFilter) -> Result<Vec<Manifest>> {
        let _guard = self.lock.lock().await;
        Ok(filter.apply(self.updateable_locked(reset).await?))
    }

    fn installed_locked(&self, reset: bool) -> Result<Vec<Manifest>> {
        if !reset {
            if let Some(apps) = self.cached(INSTALLED_KEY)? {
                return Ok(apps);
            }
        }
        let apps = self.store.scan()?;
        tracing::debug!("Scanned {} installed apps", apps.len());
        self.put(INSTALLED_KEY, &apps)?;
        Ok(apps)
    }

    async fn available_locked(&self, reset: bool) -> Result<Vec<Manifest>> {
        if !reset {
            if let Some(apps) = self.cached(AVAILABLE_KEY)? {
                return Ok(apps);
            }
        }
        let apps = self.catalog.list().await?;
        self.put(AVAILABLE_KEY, &apps)?;
        Ok(apps)
    }

    async fn updateable_locked(&self, reset: bool) -> Result<Vec<Manifest>> {
        if !reset {
            if let Some(apps) = self.cached(UPDATEABLE_KEY)? {
                return Ok(apps);
            }
        }
        let available = self.available_locked(false).await?;
        let installed = self.installed_locked(false)?;
        let apps = compute_updateable(&available, &installed);
        self.put(UPDATEABLE_KEY, &apps)?;
        Ok(apps)
    }

    /// Stored list under `key`. Empty or unreadable lists count as a miss.
    fn cached(&self, key: &str) -> Result<Option<Vec<Manifest>>> {
        let Some(storage) = &self.storage else {
            return Ok(None);
        };
        let Some(values) = Self::stored(storage.as_ref(), key)? else {
            return Ok(None);
        };
        if values.is_empty() {
            return Ok(None);
        }

        let mut apps = Vec::with_capacity(values.len());
        for value in values {
            match Manifest::from_value(value) {
                Ok(m) => apps.push(m),
                Err(e) => {
                    tracing::warn!("Discarding cached list {key}: {e}");
                    return Ok(None);
                }
            }
        }
        Ok(Some(apps))
    }

    /// Raw list under `key`. A list that no longer decodes is treated as
    /// absent; the next refresh overwrites it.
    fn stored(storage: &dyn Storage, key: &str) -> Result<Option<Vec<Value>>> {
        match storage.get_list(key) {
            Ok(values) => Ok(values),
            Err(e @ StorageError::Corrupt { .. }) => {
                tracing::warn!("Ignoring stored list: {e}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, apps: &[Manifest]) -> Result<()> {
        if let Some(storage) = &self.storage {
            let values: Vec<_> = apps.iter().map(Manifest::to_value).collect();
            storage.set_list(key, &values)?;
        }
        Ok(())
    }

    /// Remove every stored entry whose pid is `pid` from the list under `key`.
    fn remove_pid(storage: &dyn Storage, key: &str, pid: &str) -> Result<()> {
        let Some(values) = Self::stored(storage, key)? else {
            return Ok(());
        };
        for value in values.iter().filter(|v| v.get("pid").and_then(|p| p.as_str()) == Some(pid)) {
            storage.remove(key, value)?;
        }
        Ok(())
    }

    /// Record a freshly installed app.
    ///
    /// Any stale entry with the same pid is replaced, keeping pids unique, and
    /// the app is dropped from the updateable list. A list that was never
    /// populated stays absent so the next read performs a full scan instead of
    /// returning a one-element list.
    ///
    /// # Errors
    ///
    /// The storage rejected the update.
    pub async fn record_installed(&self, manifest: &Manifest) -> Result<()> {
        let _guard = self.lock.lock().await;
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        Self::remove_pid(storage.as_ref(), INSTALLED_KEY, &manifest.pid)?;
        if Self::stored(storage.as_ref(), INSTALLED_KEY)?.is_some() {
            storage.append(INSTALLED_KEY, &manifest.to_value())?;
        }
        Self::remove_pid(storage.as_ref(), UPDATEABLE_KEY, &manifest.pid)?;
        Ok(())
    }

    /// Drop a removed app from the installed and updateable lists.
    ///
    /// # Errors
    ///
    /// The storage rejected the update.
    pub async fn forget(&self, pid: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(storage) = &self.storage {
            Self::remove_pid(storage.as_ref(), INSTALLED_KEY, pid)?;
            Self::remove_pid(storage.as_ref(), UPDATEABLE_KEY, pid)?;
        }
        if let Ok(mut verified) = self.verified.write() {
            verified.remove(pid);
        }
        Ok(())
    }

    /// Drop all three lists; the next reads rebuild them.
    ///
    /// # Errors
    ///
    /// The storage rejected the deletion.
    pub async fn reset_all(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(storage) = &self.storage {
            for key in [INSTALLED_KEY, AVAILABLE_KEY, UPDATEABLE_KEY] {
                storage.delete(key)?;
            }
        }
        Ok(())
    }

    /// Remember the aggregate status of every app in `report`.
    pub fn record_verification(&self, report: &VerificationReport) {
        if let Ok(mut verified) = self.verified.write() {
            for app in report.iter() {
                verified.insert(app.app.to_string(), app.passed());
            }
        }
    }

    /// Last recorded aggregate status for `pid`, if it was ever verified.
    pub fn verification_status(&self, pid: &str) -> Option<bool> {
        self.verified.read().ok()?.get(pid).copied()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, SqliteStorage};
    use crate::store::tests::write_bundle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Catalog fake serving a fixed list and counting fetches.
    #[derive(Debug, Default)]
    pub(crate) struct StaticCatalog {
        pub(crate) apps: Vec<Manifest>,
        pub(crate) bundles: HashMap<String, Vec<u8>>,
        pub(crate) fetches: AtomicUsize,
    }

    #[async_trait]
    impl Catalog for StaticCatalog {
        async fn list(&self) -> Result<Vec<Manifest>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.apps.clone())
        }

        async fn fetch_bundle(&self, id: &str) -> Result<Vec<u8>> {
            self.bundles
                .get(id)
                .cloned()
                .ok_or_else(|| crate::AppError::RetrievalFailed(format!("No such plugin: {id}")))
        }
    }

    fn cache_with(
        dir: &std::path::Path,
        catalog: Arc<StaticCatalog>,
        storage: Option<Arc<dyn Storage>>,
    ) -> CatalogCache {
        CatalogCache::new(BundleStore::open(dir).unwrap(), catalog, storage)
    }

    #[test]
    fn test_compute_updateable() {
        let installed = vec![Manifest::new("blog", "1.0"), Manifest::new("wiki", "2.0")];
        let available = vec![
            Manifest::new("blog", "1.1"),
            Manifest::new("wiki", "2.0"),
            Manifest::new("chat", "0.1"),
        ];
        let up = compute_updateable(&available, &installed);
        assert_eq!(up, vec![Manifest::new("blog", "1.1")]);
    }

    #[tokio::test]
    async fn test_updateable_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(StaticCatalog {
            apps: vec![Manifest::new("blog", "1.1")],
            ..Default::default()
        });
        let cache = cache_with(dir.path(), catalog, Some(Arc::new(MemoryStorage::new())));
        write_bundle(
            cache.store(),
            "blog",
            r#"{"pid": "blog", "version": "1.0", "dependencies": []}"#,
        );

        let up = cache.list_updateable(false, &AppFilter::none()).await.unwrap();
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].pid, "blog");
        assert_eq!(up[0].version, "1.1");
    }

    #[tokio::test]
    async fn test_available_is_cached_until_reset() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(StaticCatalog {
            apps: vec![Manifest::new("blog", "1.1")],
            ..Default::default()
        });
        let cache = cache_with(
            dir.path(),
            Arc::clone(&catalog),
            Some(Arc::new(MemoryStorage::new())),
        );

        cache.list_available(false, &AppFilter::none()).await.unwrap();
        cache.list_available(false, &AppFilter::none()).await.unwrap();
        assert_eq!(catalog.fetches.load(Ordering::SeqCst), 1);

        cache.list_available(true, &AppFilter::none()).await.unwrap();
        assert_eq!(catalog.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_without_storage_every_read_rescans() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(StaticCatalog::default());
        let cache = cache_with(dir.path(), catalog, None);

        assert!(cache.list_installed(false, &AppFilter::none()).await.unwrap().is_empty());
        write_bundle(cache.store(), "blog", r#"{"pid": "blog", "version": "1.0"}"#);
        assert_eq!(
            cache.list_installed(false, &AppFilter::none()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_stale_installed_list_until_reset() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_with(
            dir.path(),
            Arc::new(StaticCatalog::default()),
            Some(Arc::new(MemoryStorage::new())),
        );
        write_bundle(cache.store(), "blog", r#"{"pid": "blog", "version": "1.0"}"#);
        assert_eq!(cache.list_installed(false, &AppFilter::none()).await.unwrap().len(), 1);

        write_bundle(cache.store(), "wiki", r#"{"pid": "wiki", "version": "1.0"}"#);
        assert_eq!(cache.list_installed(false, &AppFilter::none()).await.unwrap().len(), 1);
        assert_eq!(cache.list_installed(true, &AppFilter::none()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_installed_replaces_same_pid() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let catalog = Arc::new(StaticCatalog {
            apps: vec![Manifest::new("blog", "1.1")],
            ..Default::default()
        });
        let cache = cache_with(dir.path(), catalog, Some(Arc::clone(&storage)));
        write_bundle(cache.store(), "blog", r#"{"pid": "blog", "version": "1.0"}"#);
        write_bundle(cache.store(), "wiki", r#"{"pid": "wiki", "version": "1.0"}"#);

        assert_eq!(cache.list_updateable(false, &AppFilter::none()).await.unwrap().len(), 1);

        cache.record_installed(&Manifest::new("blog", "1.1")).await.unwrap();

        let installed = cache.list_installed(false, &AppFilter::none()).await.unwrap();
        let blogs: Vec<_> = installed.iter().filter(|m| m.pid == "blog").collect();
        assert_eq!(blogs.len(), 1);
        assert_eq!(blogs[0].version, "1.1");
        assert_eq!(installed.len(), 2);
        assert_eq!(storage.get_list(UPDATEABLE_KEY).unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn test_record_installed_does_not_seed_missing_list() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let cache = cache_with(
            dir.path(),
            Arc::new(StaticCatalog::default()),
            Some(Arc::clone(&storage)),
        );
        cache.record_installed(&Manifest::new("blog", "1.0")).await.unwrap();
        assert_eq!(storage.get_list(INSTALLED_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_forget_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_with(
            dir.path(),
            Arc::new(StaticCatalog::default()),
            Some(Arc::new(MemoryStorage::new())),
        );
        write_bundle(
            cache.store(),
            "blog",
            r#"{"pid": "blog", "version": "1.0", "type": "website"}"#,
        );
        write_bundle(cache.store(), "db", r#"{"pid": "db", "version": "1.0", "type": "database"}"#);

        let sites = cache
            .list_installed(false, &AppFilter::none().with("type", "website"))
            .await
            .unwrap();
        assert_eq!(sites.len(), 1);

        cache.forget("blog").await.unwrap();
        let all = cache.list_installed(false, &AppFilter::none()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].pid, "db");
    }

    #[tokio::test]
    async fn test_corrupt_stored_list_is_rebuilt() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("state.db");
        let apps = dir.path().join("apps");
        {
            let storage = SqliteStorage::open(&db).unwrap();
            storage.set_list(INSTALLED_KEY, &[]).unwrap();
        }
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute(
            "UPDATE lists SET items = ?1 WHERE key = ?2",
            rusqlite::params!["[{\"pid\": ", INSTALLED_KEY],
        )
        .unwrap();
        drop(conn);

        let storage: Arc<dyn Storage> = Arc::new(SqliteStorage::open(&db).unwrap());
        let cache = CatalogCache::new(
            BundleStore::open(&apps).unwrap(),
            Arc::new(StaticCatalog::default()),
            Some(Arc::clone(&storage)),
        );
        write_bundle(cache.store(), "blog", r#"{"pid": "blog", "version": "1.0"}"#);

        // Mutations skip the unreadable list instead of failing.
        cache.record_installed(&Manifest::new("wiki", "1.0")).await.unwrap();
        cache.forget("wiki").await.unwrap();

        let installed = cache.list_installed(false, &AppFilter::none()).await.unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].pid, "blog");
        assert_eq!(storage.get_list(INSTALLED_KEY).unwrap().map(|l| l.len()), Some(1));
    }
}
