//! Remove command
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use hostapp_core::{AppError, Reporter};
use hostapp_schema::{AppId, Operation};

use super::{Settings, confirm};
use crate::ui::Output;
use crate::ui::list::print_plan;

/// Remove an app together with every installed app that depends on it.
///
/// Dependents are removed first, deepest first, so each removal sees no
/// remaining dependents. With `force` only `id` itself is removed and its
/// dependents are left in place.
pub async fn remove(settings: &Settings, id: &str, force: bool, yes: bool) -> Result<()> {
    let output = Arc::new(Output::new());
    let manager = settings.manager(&output)?;

    let plan = if force {
        Vec::new()
    } else {
        manager
            .execution_plan(id, Operation::Remove)
            .await
            .with_context(|| format!("Failed to plan removal of {id}"))?
    };

    if !plan.is_empty() {
        output.section(&format!("Removing {id} also removes"));
        print_plan(&output, &plan);
    }

    if settings.dry_run {
        output.info("Dry run, nothing was removed.");
        return Ok(());
    }

    let total = plan.len() + 1;
    let question = if total == 1 {
        format!("Remove {id}?")
    } else {
        format!("Remove {total} apps?")
    };
    if !yes && !confirm(&question)? {
        output.error("Operation cancelled");
        return Ok(());
    }

    output.section("Removing");
    let start = Instant::now();
    let targets = plan
        .iter()
        .map(|item| item.app_id().as_str())
        .chain(std::iter::once(id));

    let mut count = 0;
    for target in targets {
        match manager.remove(target, force).await {
            Ok(outcome) => {
                count += 1;
                let detail = if outcome.uninstalled.is_empty() {
                    "removed".to_string()
                } else {
                    format!("removed, uninstalled {}", outcome.uninstalled.join(", "))
                };
                output.done(&AppId::new(target), &detail);
            }
            Err(e @ AppError::DependencyBlocked { .. }) => {
                output.failed(&AppId::new(target), &e.to_string());
                output.info("Use --force to remove it anyway.");
                return Err(e.into());
            }
            Err(e) => {
                output.failed(&AppId::new(target), &e.to_string());
                return Err(e).with_context(|| format!("Failed to remove {target}"));
            }
        }
    }

    output.summary(count, "removed", start.elapsed().as_secs_f64());
    Ok(())
}
