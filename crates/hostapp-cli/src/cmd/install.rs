//! Install command
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use hostapp_core::Reporter;
use hostapp_schema::{AppId, Operation};

use super::{Settings, confirm};
use crate::ui::Output;
use crate::ui::list::print_plan;

/// Install an app, preceded by the apps it depends on.
///
/// The cascade plan is shown first and needs confirmation unless `yes` is
/// set. Dependencies are installed deepest first.
pub async fn install(settings: &Settings, id: &str, verify: bool, yes: bool) -> Result<()> {
    let output = Arc::new(Output::new());
    let manager = settings.manager(&output)?;

    let plan = manager
        .execution_plan(id, Operation::Install)
        .await
        .with_context(|| format!("Failed to plan install of {id}"))?;

    if !plan.is_empty() {
        output.section(&format!("Installing {id} also installs"));
        print_plan(&output, &plan);
    }

    if settings.dry_run {
        output.info("Dry run, nothing was installed.");
        return Ok(());
    }

    if !plan.is_empty() && !yes && !confirm("Continue?")? {
        output.error("Operation cancelled");
        return Ok(());
    }

    output.section("Installing");
    let start = Instant::now();
    let targets = plan
        .iter()
        .map(|item| item.app_id().as_str())
        .chain(std::iter::once(id));

    let mut count = 0;
    for target in targets {
        let outcome = match manager.install(target, verify).await {
            Ok(outcome) => outcome,
            Err(e) => {
                output.failed(&AppId::new(target), &e.to_string());
                return Err(e).with_context(|| format!("Failed to install {target}"));
            }
        };
        count += 1;

        let manifest = &outcome.manifest;
        match &outcome.verification {
            Some(verification) if !verification.passed() => {
                if verification.needs_restart() {
                    output.warning(&format!("{} needs a restart to finish setup", manifest.pid));
                }
                output.failed(&manifest.pid, "installed, but dependencies did not verify");
            }
            _ => output.done(&manifest.pid, &format!("installed {}", manifest.version)),
        }
    }

    output.summary(count, "installed", start.elapsed().as_secs_f64());
    Ok(())
}
