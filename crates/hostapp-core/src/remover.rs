//! App removal.
//!
//! Removal checks for dependents before touching anything: a blocked remove
//! leaves the bundle, the system packages and the cache exactly as they were.
//! Once the bundle is deleted, system packages that no other installed app
//! declares are uninstalled (unless protected), stopping their daemons first.
//! Failures in that cleanup are collected as warnings.

use std::collections::BTreeSet;

use hostapp_schema::{Dependency, Manifest};

use crate::context::Context;
use crate::error::{AppError, Result};
use crate::filter::AppFilter;

/// What a removal did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoveOutcome {
    /// System packages that were uninstalled.
    pub uninstalled: Vec<String>,
    /// System packages kept because another installed app still needs them.
    pub shared: Vec<String>,
    /// System packages kept because they are protected.
    pub protected: Vec<String>,
    /// Cleanup steps that failed without aborting the removal.
    pub warnings: Vec<String>,
}

/// A system dependency that may be uninstalled along with its app.
struct Candidate<'a> {
    package: &'a str,
    daemon: Option<&'a str>,
}

fn system_dependencies(manifest: &Manifest) -> Vec<Candidate<'_>> {
    let mut seen = BTreeSet::new();
    manifest
        .dependencies
        .iter()
        .filter_map(|dep| match dep {
            Dependency::System {
                package, daemon, ..
            } if seen.insert(package.as_str()) => Some(Candidate {
                package: package.as_str(),
                daemon: daemon.as_deref(),
            }),
            _ => None,
        })
        .collect()
}

/// Remove the installed app `id`.
///
/// With `force`, installed apps that depend on `id` do not block the removal
/// (they are left installed with a dangling dependency).
///
/// # Errors
///
/// - [`AppError::InvalidId`] when `id` does not name a bundle directory
/// - [`AppError::NotFound`] when no bundle for `id` is installed
/// - [`AppError::DependencyBlocked`] when another installed app depends on
///   `id` and `force` is not set; nothing has been changed
/// - [`AppError::Io`] when the bundle directory cannot be deleted
pub async fn remove(ctx: &Context, id: &str, force: bool) -> Result<RemoveOutcome> {
    let store = ctx.cache.store();
    let manifest = store.load(id)?;

    let _tx = ctx.transaction.lock().await;
    let installed = ctx.cache.list_installed(false, &AppFilter::none()).await?;
    let others: Vec<&Manifest> = installed.iter().filter(|m| m.pid != id).collect();

    if !force {
        if let Some(blocker) = others.iter().find(|m| m.depends_on_app(id)) {
            return Err(AppError::DependencyBlocked {
                target: manifest.pid.clone(),
                blocker: blocker.pid.clone(),
            });
        }
    }

    ctx.reporter.removing(&manifest.pid);
    store.delete(id)?;

    let mut outcome = RemoveOutcome::default();
    for candidate in system_dependencies(&manifest) {
        let package = candidate.package;
        if others.iter().any(|m| m.needs_system_package(package)) {
            tracing::debug!("Keeping {package}: still required by another app");
            outcome.shared.push(package.to_string());
            continue;
        }
        if ctx.protected.contains(package) {
            tracing::debug!("Keeping protected package {package}");
            outcome.protected.push(package.to_string());
            continue;
        }

        if let Some(daemon) = candidate.daemon {
            if let Err(e) = ctx.services.stop(daemon).await {
                outcome.warnings.push(format!("Failed to stop {daemon}: {e}"));
            }
            if let Err(e) = ctx.services.disable(daemon).await {
                outcome.warnings.push(format!("Failed to disable {daemon}: {e}"));
            }
        }

        match ctx.system.remove(&[package.to_string()], ctx.purge).await {
            Ok(()) => outcome.uninstalled.push(package.to_string()),
            Err(e) => outcome.warnings.push(format!("Failed to uninstall {package}: {e}")),
        }
    }

    ctx.cache.forget(id).await?;

    for warning in &outcome.warnings {
        tracing::warn!("{warning}");
        ctx.reporter.warning(warning);
    }
    tracing::info!(
        "Removed {} ({} system packages uninstalled)",
        manifest.pid,
        outcome.uninstalled.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer::tests::context;
    use crate::store::tests::write_bundle;
    use crate::verifier::tests::FakePackages;
    use hostapp_schema::MANIFEST_FILE;
    use std::collections::HashMap;
    use std::sync::Arc;

    const BLOG: &str = r#"{
        "pid": "blog",
        "version": "1.0",
        "dependencies": [
            {"type": "system", "package": "php", "daemon": "php-fpm"},
            {"type": "system", "package": "libfoo"},
            {"type": "system", "package": "nginx", "daemon": "nginx"}
        ]
    }"#;

    fn setup(dir: &std::path::Path) -> (Context, Arc<FakePackages>) {
        let system = Arc::new(FakePackages::with_installed(&["php", "libfoo", "nginx"]));
        let ctx = context(dir, HashMap::new(), Arc::clone(&system));
        write_bundle(ctx.cache.store(), "blog", BLOG);
        (ctx, system)
    }

    #[tokio::test]
    async fn test_blocked_remove_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, system) = setup(dir.path());
        write_bundle(
            ctx.cache.store(),
            "theme",
            r#"{"pid": "theme", "version": "1", "dependencies": [{"type": "app", "package": "blog"}]}"#,
        );

        let err = remove(&ctx, "blog", false).await.unwrap_err();
        match err {
            AppError::DependencyBlocked { target, blocker } => {
                assert_eq!(target, "blog");
                assert_eq!(blocker, "theme");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(ctx.cache.store().contains("blog"));
        assert!(system.removed.lock().unwrap().is_empty());
        let installed = ctx.cache.list_installed(false, &AppFilter::none()).await.unwrap();
        assert_eq!(installed.len(), 2);
    }

    #[tokio::test]
    async fn test_force_ignores_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = setup(dir.path());
        write_bundle(
            ctx.cache.store(),
            "theme",
            r#"{"pid": "theme", "version": "1", "dependencies": [{"type": "app", "package": "blog"}]}"#,
        );

        remove(&ctx, "blog", true).await.unwrap();
        assert!(!ctx.cache.store().contains("blog"));
        assert!(ctx.cache.store().contains("theme"));
    }

    #[tokio::test]
    async fn test_shared_and_protected_packages_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, system) = setup(dir.path());
        write_bundle(
            ctx.cache.store(),
            "wiki",
            r#"{"pid": "wiki", "version": "1", "dependencies": [{"type": "system", "package": "libfoo"}]}"#,
        );

        let outcome = remove(&ctx, "blog", false).await.unwrap();
        assert_eq!(outcome.uninstalled, vec!["php"]);
        assert_eq!(outcome.shared, vec!["libfoo"]);
        assert_eq!(outcome.protected, vec!["nginx"]);
        assert!(outcome.warnings.is_empty());

        assert!(!system.has("php"));
        assert!(system.has("libfoo"));
        assert!(system.has("nginx"));
        assert!(!ctx.cache.store().contains("blog"));
    }

    #[tokio::test]
    async fn test_unshared_package_is_uninstalled_with_daemon_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, system) = setup(dir.path());
        let services = Arc::new(crate::installer::tests::FakeServices::default());
        let ctx = Context {
            services: services.clone(),
            ..ctx
        }
        .with_protected(Vec::<String>::new());

        let outcome = remove(&ctx, "blog", false).await.unwrap();
        assert_eq!(outcome.uninstalled, vec!["php", "libfoo", "nginx"]);
        assert_eq!(
            *services.calls.lock().unwrap(),
            vec!["stop php-fpm", "disable php-fpm", "stop nginx", "disable nginx"]
        );
        assert!(system.installed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_forgets_cached_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = setup(dir.path());
        write_bundle(ctx.cache.store(), "wiki", r#"{"pid": "wiki", "version": "1"}"#);
        assert_eq!(ctx.cache.list_installed(false, &AppFilter::none()).await.unwrap().len(), 2);

        remove(&ctx, "blog", false).await.unwrap();
        let installed = ctx.cache.list_installed(false, &AppFilter::none()).await.unwrap();
        let pids: Vec<&str> = installed.iter().map(|m| m.pid.as_str()).collect();
        assert_eq!(pids, vec!["wiki"]);
    }

    #[tokio::test]
    async fn test_missing_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = setup(dir.path());
        assert!(matches!(
            remove(&ctx, "ghost", false).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_stays_inside_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let apps = dir.path().join("apps");
        let (ctx, _) = setup(&apps);
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"{"pid": "parent", "version": "1"}"#,
        )
        .unwrap();

        for id in ["..", "../apps", "blog/.."] {
            assert!(matches!(
                remove(&ctx, id, true).await,
                Err(AppError::InvalidId(_))
            ));
        }
        assert!(dir.path().join(MANIFEST_FILE).exists());
        assert!(ctx.cache.store().contains("blog"));
    }
}
