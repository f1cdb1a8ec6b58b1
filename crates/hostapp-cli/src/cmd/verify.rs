use std::sync::Arc;

use anyhow::{Context, Result, bail};
use hostapp_core::Reporter;

use super::Settings;
use crate::ui::Output;
use crate::ui::list::print_verification;

/// Verify (and install missing) dependencies of every installed app.
pub async fn verify(settings: &Settings) -> Result<()> {
    let output = Arc::new(Output::new());
    let manager = settings.manager(&output)?;

    if settings.dry_run {
        let installed = manager.list_installed(false, &hostapp_core::AppFilter::none()).await?;
        output.info(&format!(
            "Dry run, would verify {} installed apps.",
            installed.len()
        ));
        return Ok(());
    }

    output.section("Verifying");
    let report = manager
        .verify_installed()
        .await
        .context("Failed to verify installed apps")?;

    if report.is_empty() {
        output.info("No apps installed.");
        return Ok(());
    }

    output.line("");
    print_verification(&output, &report);

    let failed = report.iter().filter(|app| !app.passed()).count();
    if failed > 0 {
        if report.iter().any(hostapp_schema::AppVerification::needs_restart) {
            output.warning("Some dependencies only take effect after a restart.");
        }
        bail!("{failed} of {} apps did not verify", report.len());
    }
    output.success(&format!("{} apps verified", report.len()));
    Ok(())
}
