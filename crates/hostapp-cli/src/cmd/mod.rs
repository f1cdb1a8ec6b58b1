//! Subcommand implementations.

pub mod completions;
pub mod install;
pub mod list;
pub mod plan;
pub mod remove;
pub mod reset;
pub mod verify;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use hostapp_core::{AppFilter, AppManager, Config};

use crate::ui::Output;

/// Global options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub config: Option<PathBuf>,
    pub repo_server: Option<String>,
    pub dry_run: bool,
}

impl Settings {
    /// Load the configuration file and apply command-line overrides.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_default()?,
        };
        if let Some(server) = &self.repo_server {
            tracing::debug!("Catalog server overridden to {server}");
            config.general.repo_server.clone_from(server);
        }
        Ok(config)
    }

    /// Build an [`AppManager`] reporting through `output`.
    pub fn manager(&self, output: &Arc<Output>) -> Result<AppManager> {
        let config = self.load_config().context("Failed to load configuration")?;
        let manager = AppManager::from_config(&config).context("Failed to initialize app manager")?;
        Ok(manager.with_reporter(output.clone()))
    }
}

/// Parse `--filter key=value` arguments.
pub fn parse_filters(filters: &[String]) -> Result<AppFilter> {
    AppFilter::parse(filters).map_err(anyhow::Error::msg)
}

/// Ask a yes/no question on stdin. Anything but `y` declines.
pub fn confirm(question: &str) -> Result<bool> {
    println!();
    print!("  {} {question} (y/N) ", "?".bold().yellow());
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
