//! App installation.
//!
//! Fetch the bundle from the catalog, unpack it into the bundle store, load
//! its manifest, optionally verify its dependencies, and record it as
//! installed. Verification failures never fail the install; they are
//! reported in the outcome.

use hostapp_schema::{AppVerification, Manifest, VerificationReport};

use crate::context::Context;
use crate::error::Result;
use crate::filter::AppFilter;

/// What an install produced.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallOutcome {
    /// Manifest of the installed bundle.
    pub manifest: Manifest,
    /// Present when verification was requested.
    pub verification: Option<AppVerification>,
}

impl InstallOutcome {
    /// Whether the app is ready to use: verification passed or was skipped.
    pub fn is_ready(&self) -> bool {
        self.verification.as_ref().is_none_or(AppVerification::passed)
    }
}

/// Install the app `id` from the catalog.
///
/// # Errors
///
/// - [`AppError::RetrievalFailed`](crate::AppError::RetrievalFailed) or
///   [`AppError::Timeout`](crate::AppError::Timeout) when the bundle cannot be fetched
/// - [`AppError::Extract`](crate::AppError::Extract) when the archive is corrupt;
///   files already extracted are left in place
/// - [`AppError::NotFound`](crate::AppError::NotFound) or
///   [`AppError::ManifestParse`](crate::AppError::ManifestParse) when the bundle
///   does not carry a usable `<id>/manifest.json`
pub async fn install(ctx: &Context, id: &str, verify: bool) -> Result<InstallOutcome> {
    let store = ctx.cache.store();

    let payload = ctx.cache.catalog().fetch_bundle(id).await?;
    tracing::debug!("Fetched {} byte bundle for {id}", payload.len());

    let files = store.unpack(&payload)?;
    tracing::debug!("Unpacked {} files for {id}", files.len());

    let manifest = store.load(id)?;
    ctx.reporter.installing(&manifest.pid);

    let verification = if verify {
        ctx.reporter.verifying(&manifest.pid);
        let installed = ctx.cache.list_installed(false, &AppFilter::none()).await?;
        let verification = ctx
            .verifier()
            .verify_one(&manifest, |pid| {
                installed
                    .iter()
                    .any(|m| m.pid == pid)
                    .then(|| ctx.cache.verification_status(pid).unwrap_or(true))
            })
            .await;
        for check in &verification.checks {
            ctx.reporter.checked(&manifest.pid, check);
        }
        Some(verification)
    } else {
        None
    };

    {
        let _tx = ctx.transaction.lock().await;
        ctx.cache.record_installed(&manifest).await?;
        if let Some(verification) = &verification {
            let mut report = VerificationReport::new();
            report.insert(verification.clone());
            ctx.cache.record_verification(&report);
        }
    }

    tracing::info!("Installed {} {}", manifest.pid, manifest.version);
    Ok(InstallOutcome {
        manifest,
        verification,
    })
}
