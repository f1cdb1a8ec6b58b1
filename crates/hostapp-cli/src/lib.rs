//! hostapp - host application manager
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Installs, verifies and removes pluggable applications on a host.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.hostapp/
//! ├── apps/         # One extracted bundle per app
//! ├── config.toml   # Optional configuration
//! └── state.db      # SQLite cache of app lists
//! ```

pub mod cmd;
pub mod ui;

pub use hostapp_core::USER_AGENT;
pub use hostapp_core::paths::*;

use clap::{Parser, Subcommand};
use hostapp_schema::Operation;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hostapp")]
#[command(author, version, about = "hostapp - manage pluggable host applications")]
pub struct Cli {
    /// Configuration file (defaults to $HOSTAPP_HOME/config.toml)
    #[arg(long, global = true, env = "HOSTAPP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Catalog server, overriding the configuration
    #[arg(long, global = true, env = "HOSTAPP_REPO_SERVER")]
    pub repo_server: Option<String>,

    /// Show what would happen without making changes
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List installed apps
    List {
        /// Rescan the bundle store instead of using the cached list
        #[arg(long)]
        reset: bool,
        /// Only show apps whose manifest field matches (key=value)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
    /// List apps published by the catalog
    Available {
        /// Refetch the catalog instead of using the cached list
        #[arg(long)]
        reset: bool,
        /// Only show apps whose manifest field matches (key=value)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
    /// List installed apps with a different version in the catalog
    Updates {
        /// Recompute instead of using the cached list
        #[arg(long)]
        reset: bool,
        /// Only show apps whose manifest field matches (key=value)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
    /// Install an app and the apps it depends on
    Install {
        /// App id
        id: String,
        /// Verify (and install) system, runtime and app dependencies
        #[arg(long)]
        verify: bool,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Remove an app and the apps that depend on it
    Remove {
        /// App id
        id: String,
        /// Remove even if other installed apps depend on it
        #[arg(long, short = 'f')]
        force: bool,
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Show the cascade an install or remove would trigger
    Plan {
        /// App id
        id: String,
        /// Operation to plan
        #[arg(long)]
        op: Operation,
    },
    /// Verify the dependencies of every installed app
    Verify,
    /// Drop cached app lists
    Reset,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
