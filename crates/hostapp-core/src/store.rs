//! Bundle store: one extracted app bundle per subdirectory.
//!
//! ```text
//! <app_dir>/
//! ├── blog/
//! │   ├── manifest.json
//! │   └── ...payload
//! └── wiki/
//!     └── manifest.json
//! ```

use std::collections::HashSet;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use hostapp_schema::{AppId, MANIFEST_FILE, Manifest};

use crate::error::{AppError, Result};
use crate::io::extract::extract_tar_gz;

/// Local directory of extracted app bundles.
#[derive(Debug, Clone)]
pub struct BundleStore {
    root: PathBuf,
}

impl BundleStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// The directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory the bundles live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the bundle for `id`.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidId`] unless `id` is a single visible path component.
    pub fn bundle_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.root.join(checked(id)?))
    }

    /// Location of the manifest for `id`.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidId`] as for [`BundleStore::bundle_path`].
    pub fn manifest_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.bundle_path(id)?.join(MANIFEST_FILE))
    }

    /// Whether a bundle directory exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.bundle_path(id).is_ok_and(|path| path.is_dir())
    }

    /// Load the manifest of an extracted bundle.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidId`] for ids outside the store,
    /// [`AppError::NotFound`] when no manifest exists for `id`,
    /// [`AppError::ManifestParse`] when it cannot be parsed.
    pub fn load(&self, id: &str) -> Result<Manifest> {
        let path = self.manifest_path(id)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(AppId::new(id)));
            }
            Err(e) => return Err(e.into()),
        };
        Manifest::from_json(&text).map_err(|source| AppError::ManifestParse { path, source })
    }

    /// Read every bundle's manifest.
    ///
    /// Hidden entries are ignored. A bundle whose manifest is missing or
    /// malformed is logged and skipped; it never fails the whole scan. When
    /// two bundles claim the same pid the first one (by directory name) wins.
    ///
    /// # Errors
    ///
    /// The root cannot be listed. Broken bundles are skipped, not reported.
    pub fn scan(&self) -> Result<Vec<Manifest>> {
        let mut names: Vec<String> = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|name| !name.starts_with('.'))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        names.sort();

        let mut seen = HashSet::new();
        let mut apps = Vec::with_capacity(names.len());
        for name in names {
            tracing::debug!("Scanning data for {name}");
            match self.load(&name) {
                Ok(manifest) => {
                    if seen.insert(manifest.pid.clone()) {
                        apps.push(manifest);
                    } else {
                        tracing::warn!(
                            "Skipping {name}: pid '{}' already provided by another bundle",
                            manifest.pid
                        );
                    }
                }
                Err(e) => tracing::error!("Failed to scan and import {name}: {e}"),
            }
        }
        Ok(apps)
    }

    /// Unpack a gzip tar bundle into the store.
    ///
    /// The payload is staged as a hidden temporary archive inside the store
    /// root, extracted in place, and the archive is deleted afterwards even if
    /// extraction fails. Files already written by a failed extraction stay.
    ///
    /// # Errors
    ///
    /// IO failures staging the archive, or [`AppError::Extract`].
    pub fn unpack(&self, payload: &[u8]) -> Result<Vec<PathBuf>> {
        let mut archive = tempfile::Builder::new()
            .prefix(".bundle-")
            .suffix(".tar.gz")
            .tempfile_in(&self.root)?;
        archive.write_all(payload)?;
        archive.flush()?;

        let files = extract_tar_gz(archive.path(), &self.root)?;
        archive.close()?;
        Ok(files)
    }

    /// Delete the bundle directory for `id`.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidId`] for ids outside the store, or the directory
    /// exists but cannot be removed.
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.bundle_path(id)?;
        match std::fs::remove_dir_all(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Bundle {} already gone", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Bundle directories are plain names directly under the root. Hidden names
/// are reserved for staging archives.
fn checked(id: &str) -> Result<&str> {
    let mut components = Path::new(id).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || id.starts_with('.') || id.contains(['/', '\\']) {
        return Err(AppError::InvalidId(id.to_string()));
    }
    Ok(id)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn write_bundle(store: &BundleStore, dir: &str, manifest: &str) {
        let path = store.root().join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join(MANIFEST_FILE), manifest).unwrap();
    }

    #[test]
    fn test_scan_skips_hidden_and_broken_bundles() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::open(dir.path()).unwrap();

        write_bundle(&store, "blog", r#"{"pid": "blog", "version": "1.0"}"#);
        write_bundle(&store, "wiki", r#"{"pid": "wiki", "version": "2.1"}"#);
        write_bundle(&store, ".trash", r#"{"pid": "trash", "version": "1"}"#);
        write_bundle(&store, "broken", "{ not json");
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::write(dir.path().join("stray-file"), "x").unwrap();

        let apps = store.scan().unwrap();
        let pids: Vec<&str> = apps.iter().map(|m| m.pid.as_str()).collect();
        assert_eq!(pids, vec!["blog", "wiki"]);
    }

    #[test]
    fn test_scan_keeps_pids_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::open(dir.path()).unwrap();
        write_bundle(&store, "blog", r#"{"pid": "blog", "version": "1.0"}"#);
        write_bundle(&store, "blog-copy", r#"{"pid": "blog", "version": "0.9"}"#);

        let apps = store.scan().unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].version, "1.0");
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::open(dir.path()).unwrap();
        write_bundle(&store, "broken", "[]");

        assert!(matches!(store.load("nope"), Err(AppError::NotFound(_))));
        assert!(matches!(
            store.load("broken"),
            Err(AppError::ManifestParse { .. })
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::open(dir.path()).unwrap();
        write_bundle(&store, "blog", r#"{"pid": "blog", "version": "1.0"}"#);

        store.delete("blog").unwrap();
        assert!(!store.contains("blog"));
        store.delete("blog").unwrap();
    }

    #[test]
    fn test_ids_cannot_leave_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("apps");
        let store = BundleStore::open(&root).unwrap();
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join(MANIFEST_FILE), r#"{"pid": "x", "version": "1"}"#).unwrap();

        for id in ["..", "../outside", "a/b", ".", "", ".hidden", "/tmp", "a\\b"] {
            assert!(
                matches!(store.delete(id), Err(AppError::InvalidId(_))),
                "delete({id:?}) should be rejected"
            );
            assert!(matches!(store.load(id), Err(AppError::InvalidId(_))));
            assert!(!store.contains(id));
        }
        assert!(outside.join(MANIFEST_FILE).exists());
        assert!(root.is_dir());
    }

    #[test]
    fn test_unpack_removes_staging_archive_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::open(dir.path()).unwrap();

        assert!(store.unpack(b"garbage").is_err());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }
}
