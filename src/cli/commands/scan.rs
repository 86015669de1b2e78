//! Scan command implementation.

use crate::core::catalog::CatalogStore;
use crate::core::scanner::LibraryScanner;
use crate::models::config::Config;
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Scan a media root and persist its catalog.
pub async fn scan(config: &Config, root: &Path, rebuild: bool) -> Result<()> {
    println!("{}", "[SCAN] Scanning media drive...".bold().cyan());
    println!("  Root: {}", root.display());

    let store = CatalogStore::new(config.library.catalog_path(root));
    println!("  Catalog: {}", store.path().display());
    if rebuild {
        println!("  {}", "Rebuilding: existing watch state is discarded".yellow());
    }
    println!();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Scanning for video files...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let scanner = LibraryScanner::new(root, &config.library);
    let outcome = tokio::task::spawn_blocking(move || scanner.scan_into_store(&store, rebuild))
        .await
        .context("Scan task failed")?;
    pb.finish_and_clear();

    let result = outcome.with_context(|| format!("Failed to scan {}", root.display()))?;
    let stats = &result.stats;

    println!("{}", "[OK] Scan complete".green().bold());
    println!("  Files seen: {}", stats.files_seen);
    println!("  Videos admitted: {}", stats.videos_admitted);
    println!("  Skipped (too small): {}", stats.rejected_small);
    println!("  Skipped (samples/extras): {}", stats.rejected_extras);
    if stats.dropped > 0 {
        println!("  Removed (no longer on disk): {}", stats.dropped);
    }
    println!();
    println!(
        "  {} movies, {} series, {} episodes",
        result.catalog.movie_count(),
        result.catalog.series_count(),
        result.catalog.episode_count()
    );

    if !stats.unclassified.is_empty() {
        println!();
        println!(
            "{}",
            format!("[WARN] {} files could not be classified:", stats.unclassified.len()).yellow()
        );
        for path in &stats.unclassified {
            println!("  - {}", path);
        }
    }

    Ok(())
}
