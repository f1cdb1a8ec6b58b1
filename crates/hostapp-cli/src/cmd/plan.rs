use std::sync::Arc;

use anyhow::{Context, Result};
use hostapp_core::Reporter;
use hostapp_schema::Operation;

use super::Settings;
use crate::ui::Output;
use crate::ui::list::print_plan;

/// Show the cascade `op` on `id` would trigger, without executing it.
pub async fn plan(settings: &Settings, id: &str, op: Operation) -> Result<()> {
    let output = Arc::new(Output::new());
    let manager = settings.manager(&output)?;

    let plan = manager
        .plan(id, op)
        .await
        .with_context(|| format!("Failed to plan {op} of {id}"))?;

    if plan.is_empty() {
        output.info(&format!("Nothing else to {op}."));
    } else {
        output.section(&format!("To {op} {id}"));
        print_plan(&output, &plan);
    }
    Ok(())
}
