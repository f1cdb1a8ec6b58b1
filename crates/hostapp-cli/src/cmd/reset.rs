use std::sync::Arc;

use anyhow::{Context, Result};
use hostapp_core::Reporter;

use super::Settings;
use crate::ui::Output;

/// Drop the cached installed, available and updateable lists.
pub async fn reset(settings: &Settings) -> Result<()> {
    let output = Arc::new(Output::new());
    let manager = settings.manager(&output)?;

    if settings.dry_run {
        output.info("Dry run, cached lists kept.");
        return Ok(());
    }

    manager.reset().await.context("Failed to reset cached lists")?;
    output.success("Cached app lists cleared");
    Ok(())
}
