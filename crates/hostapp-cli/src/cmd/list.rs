use std::sync::Arc;

use anyhow::{Context, Result};

use super::{Settings, parse_filters};
use crate::ui::Output;
use crate::ui::list::{print_list_footer, print_list_header, print_list_row};

/// Which app list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Installed,
    Available,
    Updates,
}

/// List installed, available or updateable apps
pub async fn list(settings: &Settings, listing: Listing, reset: bool, filters: &[String]) -> Result<()> {
    let filter = parse_filters(filters)?;
    let output = Arc::new(Output::new());
    let manager = settings.manager(&output)?;

    let apps = match listing {
        Listing::Installed => manager.list_installed(reset, &filter).await,
        Listing::Available => manager.list_available(reset, &filter).await,
        Listing::Updates => manager.list_updateable(reset, &filter).await,
    }
    .context("Failed to list apps")?;

    if apps.is_empty() {
        output.line("");
        match listing {
            Listing::Installed => {
                output.line("  No apps installed.");
                output.line("  Run 'hostapp available' to see what can be installed.");
            }
            Listing::Available => output.line("  The catalog lists no apps."),
            Listing::Updates => output.line("  All apps are up to date."),
        }
        return Ok(());
    }

    print_list_header(&output);
    for app in &apps {
        print_list_row(&output, app);
    }
    print_list_footer(&output, apps.len());
    Ok(())
}
