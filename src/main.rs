//! Media Kiosk CLI
//!
//! Finds a removable media drive, keeps its catalog up to date and plays
//! the next unwatched movie or episode through mpv.

use clap::Parser;
use media_kiosk::cli::{
    args::{Cli, Commands},
    commands::{mark, run, scan, status},
};
use media_kiosk::models::config::{load_config, Config};
use media_kiosk::preflight;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run { media_root: None }) {
        Commands::Run { media_root } => {
            if let Some(root) = media_root {
                config.volume.media_root = Some(root);
            }
            if !cli.skip_preflight {
                run_preflight_checks(&config)?;
            }
            run::run(config).await?;
        }

        Commands::Scan { root, rebuild } => {
            scan::scan(&config, &root, rebuild).await?;
        }

        Commands::Status { root } => {
            status::status(&config, &root).await?;
        }

        Commands::Mark {
            root,
            file_path,
            seen,
            ..
        } => {
            mark::mark(&config, &root, &file_path, seen).await?;
        }
    }

    Ok(())
}

/// Initialize the logging system. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("media_kiosk=debug")
        } else {
            EnvFilter::new("media_kiosk=info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

/// Run preflight checks and exit if any fail.
fn run_preflight_checks(config: &Config) -> anyhow::Result<()> {
    use colored::Colorize;

    println!("{}", "Running preflight checks...".bold());
    println!();

    let results = preflight::run_preflight_checks(config);
    preflight::print_results(&results);

    println!();

    if !preflight::all_passed(&results) {
        anyhow::bail!("Preflight checks failed. Fix the issues above or use --skip-preflight.");
    }

    Ok(())
}
