//! Staged dependency verification.
//!
//! 1. System packages: probe by binary or package query, install if missing.
//! 2. Runtime packages: probe by import or package query, install if missing.
//! 3. App dependencies: resolved against the aggregate status of sibling apps.
//!
//! Stages 1 and 2 have side effects (they install what is missing). Stage 3 is
//! pure. Nothing here mutates a [`Manifest`]; results are returned as
//! [`DependencyCheck`] values.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use hostapp_schema::{
    AppVerification, Dependency, DependencyCheck, DependencyKind, FailReason, Manifest, Outcome,
    VerificationReport,
};

use crate::backends::{RuntimePackages, SystemPackages};
use crate::error::Result;

/// Checks produced by one stage for one app.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageResult {
    /// Every check in this stage passed.
    pub passed: bool,
    /// One check per dependency of the stage's kind, in manifest order.
    pub checks: Vec<DependencyCheck>,
}

impl StageResult {
    fn from_checks(checks: Vec<DependencyCheck>) -> Self {
        Self {
            passed: checks.iter().all(|c| c.verify.is_pass()),
            checks,
        }
    }
}

/// Outcome after an install attempt for a dependency that was missing.
///
/// An `internal` dependency only takes effect after a host restart, so once an
/// install was attempted it fails with `internal_restart` whatever the install
/// returned. Otherwise a failed install keeps its error text.
fn after_install(result: Result<()>, internal: bool) -> Outcome {
    if internal {
        return Outcome::Fail(FailReason::InternalRestart);
    }
    match result {
        Ok(()) => Outcome::Pass,
        Err(e) => Outcome::Fail(FailReason::InstallFailed(e.to_string())),
    }
}

/// Stage 3 for a single app.
///
/// `status` yields the aggregate status of a settled app, or `None` when no
/// app with that pid is known.
pub fn verify_apps<F>(manifest: &Manifest, status: F) -> StageResult
where
    F: Fn(&str) -> Option<bool>,
{
    let checks = manifest
        .app_dependencies()
        .map(|pid| {
            let verify = match status(pid.as_str()) {
                None => Outcome::Fail(FailReason::NotInstalled),
                Some(true) => Outcome::Pass,
                Some(false) => Outcome::Fail(FailReason::DependencyFailed),
            };
            DependencyCheck::new(DependencyKind::App, pid.as_str(), verify)
        })
        .collect();
    StageResult::from_checks(checks)
}

/// Runs the system and runtime stages against the configured backends.
#[derive(Debug, Clone)]
pub struct Verifier {
    system: Arc<dyn SystemPackages>,
    runtime: Arc<dyn RuntimePackages>,
}

impl Verifier {
    /// Verifier installing through `system` and `runtime`.
    pub fn new(system: Arc<dyn SystemPackages>, runtime: Arc<dyn RuntimePackages>) -> Self {
        Self { system, runtime }
    }

    /// Stage 1: every `system` dependency of `manifest`, in manifest order.
    pub async fn verify_system(&self, manifest: &Manifest) -> StageResult {
        let mut checks = Vec::new();
        for dep in &manifest.dependencies {
            if let Dependency::System {
                package,
                binary,
                internal,
                ..
            } = dep
            {
                let verify = self.check_system(package, binary.as_deref(), *internal).await;
                checks.push(DependencyCheck::new(DependencyKind::System, package, verify));
            }
        }
        StageResult::from_checks(checks)
    }

    /// Stage 2: every `runtime` dependency of `manifest`, in manifest order.
    pub async fn verify_runtime(&self, manifest: &Manifest) -> StageResult {
        let mut checks = Vec::new();
        for dep in &manifest.dependencies {
            if let Dependency::Runtime {
                package,
                module,
                internal,
            } = dep
            {
                let verify = self.check_runtime(package, module.as_deref(), *internal).await;
                checks.push(DependencyCheck::new(DependencyKind::Runtime, package, verify));
            }
        }
        StageResult::from_checks(checks)
    }

    async fn check_system(&self, package: &str, binary: Option<&str>, internal: bool) -> Outcome {
        let present = match binary {
            Some(binary) if self.system.has_binary(binary) => true,
            _ => match self.system.is_installed(package).await {
                Ok(installed) => installed,
                Err(e) => {
                    tracing::warn!("Could not query system package {package}: {e}");
                    false
                }
            },
        };
        if present {
            return Outcome::Pass;
        }

        tracing::info!("Installing system package {package}");
        let result = self.system.install(&[package.to_string()], true).await;
        if let Err(e) = &result {
            tracing::warn!("Failed to install system package {package}: {e}");
        }
        after_install(result, internal)
    }

    async fn check_runtime(&self, package: &str, module: Option<&str>, internal: bool) -> Outcome {
        let present = match module {
            Some(module) => self.runtime.can_import(module).await,
            None => match self.runtime.is_installed(package).await {
                Ok(installed) => installed,
                Err(e) => {
                    tracing::warn!("Could not query runtime package {package}: {e}");
                    false
                }
            },
        };
        if present {
            return Outcome::Pass;
        }

        tracing::info!("Installing runtime package {package}");
        let result = self.runtime.install(&[package.to_string()]).await;
        if let Err(e) = &result {
            tracing::warn!("Failed to install runtime package {package}: {e}");
        }
        after_install(result, internal)
    }

    /// Stages 1 and 2 for one app, concatenated in stage order.
    async fn verify_packages(&self, manifest: &Manifest) -> AppVerification {
        let system = self.verify_system(manifest).await;
        let runtime = self.verify_runtime(manifest).await;
        let mut verification = AppVerification::new(manifest.pid.clone());
        verification.checks.extend(system.checks);
        verification.checks.extend(runtime.checks);
        verification
    }

    /// Verify one app in isolation, resolving app dependencies through `status`.
    pub async fn verify_one<F>(&self, manifest: &Manifest, status: F) -> AppVerification
    where
        F: Fn(&str) -> Option<bool>,
    {
        let mut verification = self.verify_packages(manifest).await;
        verification
            .checks
            .extend(verify_apps(manifest, status).checks);
        verification
    }

    /// Verify a set of apps together.
    ///
    /// Stages 1 and 2 run concurrently for all apps. Stage 3 then runs over
    /// the settled set until no aggregate status changes: a failure anywhere
    /// in an app-dependency chain reaches every app above it.
    pub async fn verify_all(&self, apps: &[Manifest]) -> VerificationReport {
        let packages = join_all(apps.iter().map(|m| self.verify_packages(m))).await;

        let base: HashMap<&str, bool> = packages
            .iter()
            .map(|v| (v.app.as_str(), v.passed()))
            .collect();
        let mut status = base.clone();

        // Statuses only move from pass to fail, so this settles within
        // `apps.len() + 1` rounds.
        let mut rounds = 0;
        let app_checks = loop {
            rounds += 1;
            let checks: Vec<StageResult> = apps
                .iter()
                .map(|m| verify_apps(m, |pid| status.get(pid).copied()))
                .collect();

            let mut changed = false;
            for (manifest, stage) in apps.iter().zip(&checks) {
                let next = base.get(manifest.pid.as_str()).copied().unwrap_or(true) && stage.passed;
                if status.insert(manifest.pid.as_str(), next) != Some(next) {
                    changed = true;
                }
            }
            if !changed || rounds > apps.len() {
                tracing::debug!("App dependency statuses settled after {rounds} rounds");
                break checks;
            }
        };

        let mut report = VerificationReport::new();
        for (mut verification, stage) in packages.into_iter().zip(app_checks) {
            verification.checks.extend(stage.checks);
            report.insert(verification);
        }
        report
    }
}
