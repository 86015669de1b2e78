//! Mark command implementation.

use crate::core::catalog::CatalogStore;
use crate::models::catalog::WatchStatus;
use crate::models::config::Config;
use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Set the watch status of one catalog item.
pub async fn mark(config: &Config, root: &Path, file_path: &str, seen: bool) -> Result<()> {
    let store = CatalogStore::new(config.library.catalog_path(root));
    let status = if seen { WatchStatus::Seen } else { WatchStatus::Unseen };

    if !store.update_item_status(file_path, status, None)? {
        anyhow::bail!("No catalog entry for '{}' in {}", file_path, store.path().display());
    }

    println!("{} {} -> {}", "[OK]".green(), file_path, status);
    Ok(())
}
