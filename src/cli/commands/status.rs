//! Status command implementation.

use crate::core::catalog::{CatalogStore, LoadOutcome};
use crate::core::playlist::eligible_items;
use crate::models::config::Config;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Print catalog counts and the eligible items.
pub async fn status(config: &Config, root: &Path) -> Result<()> {
    let store = CatalogStore::new(config.library.catalog_path(root));

    let catalog = match store.load_checked() {
        LoadOutcome::Loaded(catalog) => catalog,
        LoadOutcome::Missing => {
            println!(
                "{}",
                format!("[WARN] No catalog at {}", store.path().display()).yellow()
            );
            println!("  Run: media-kiosk scan {}", root.display());
            return Ok(());
        }
        LoadOutcome::Invalid(reason) => {
            anyhow::bail!("Catalog {} is invalid: {}", store.path().display(), reason);
        }
    };

    let unseen_movies = catalog.movies.iter().filter(|m| m.watch.is_unseen()).count();
    let unseen_episodes = catalog
        .series
        .values()
        .flat_map(|eps| eps.iter())
        .filter(|ep| ep.watch.is_unseen())
        .count();

    println!("{}", "[STATUS] Catalog".bold().cyan());
    println!("  Path: {}", store.path().display());
    if let Some(scanned_at) = catalog.scanned_at {
        println!("  Last scan: {}", scanned_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "  Movies: {} ({} unseen)",
        catalog.movie_count(),
        unseen_movies
    );
    println!(
        "  Series: {}, episodes: {} ({} unseen)",
        catalog.series_count(),
        catalog.episode_count(),
        unseen_episodes
    );
    println!();

    let items = eligible_items(&catalog);
    if items.is_empty() {
        println!("{}", "Nothing left to watch.".green());
        return Ok(());
    }

    println!("{}", format!("Up next ({} items):", items.len()).bold());
    for item in &items {
        if item.resume_position > 0 {
            println!(
                "  {} {}",
                item.display_title(),
                format!("(resume at {})", format_position(item.resume_position)).dimmed()
            );
        } else {
            println!("  {}", item.display_title());
        }
    }

    Ok(())
}

fn format_position(seconds: u64) -> String {
    format!("{}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
}
