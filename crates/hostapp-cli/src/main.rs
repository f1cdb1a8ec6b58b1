//! hostapp CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostapp_cli::cmd::{self, Settings};
use hostapp_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; -v only raises the default.
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings {
        config: cli.config,
        repo_server: cli.repo_server,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::List { reset, filters } => {
            cmd::list::list(&settings, cmd::list::Listing::Installed, reset, &filters).await
        }
        Commands::Available { reset, filters } => {
            cmd::list::list(&settings, cmd::list::Listing::Available, reset, &filters).await
        }
        Commands::Updates { reset, filters } => {
            cmd::list::list(&settings, cmd::list::Listing::Updates, reset, &filters).await
        }
        Commands::Install { id, verify, yes } => {
            cmd::install::install(&settings, &id, verify, yes).await
        }
        Commands::Remove { id, force, yes } => {
            cmd::remove::remove(&settings, &id, force, yes).await
        }
        Commands::Plan { id, op } => cmd::plan::plan(&settings, &id, op).await,
        Commands::Verify => cmd::verify::verify(&settings).await,
        Commands::Reset => cmd::reset::reset(&settings).await,
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
