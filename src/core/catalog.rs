//! Catalog store.
//!
//! Owns the catalog file of a media drive. Every read-modify-write goes
//! through a single lock and every write replaces the file atomically, so a
//! crash or power loss leaves either the old or the new catalog on disk.

use crate::models::catalog::{Catalog, WatchStatus};
use crate::utils::fs::{with_suffix, write_atomic};
use crate::Result;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Result of reading the catalog file.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The file was present and valid.
    Loaded(Catalog),
    /// No catalog file exists yet.
    Missing,
    /// The file exists but could not be used; holds the reason.
    Invalid(String),
}

/// Crash-safe persistence for a [`Catalog`].
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the catalog file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a rejected catalog is preserved.
    pub fn backup_path(&self) -> PathBuf {
        with_suffix(&self.path, ".backup")
    }

    /// Load the catalog, returning an empty one when the file is missing or
    /// invalid. Never fails.
    pub fn load(&self) -> Catalog {
        match self.load_checked() {
            LoadOutcome::Loaded(catalog) => catalog,
            LoadOutcome::Missing => Catalog::new(),
            LoadOutcome::Invalid(reason) => {
                tracing::warn!("Ignoring invalid catalog {}: {}", self.path.display(), reason);
                Catalog::new()
            }
        }
    }

    /// Load the catalog and report why it could not be used.
    pub fn load_checked(&self) -> LoadOutcome {
        let _guard = self.guard();
        self.read_unlocked()
    }

    /// Persist the catalog, replacing the file atomically.
    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        let _guard = self.guard();
        self.write_unlocked(catalog)
    }

    /// Copy the current (rejected) catalog file to the backup path.
    pub fn backup_invalid(&self) -> Result<()> {
        let _guard = self.guard();
        if !self.path.is_file() {
            return Ok(());
        }
        let raw = fs::read(&self.path)?;
        let backup = self.backup_path();
        write_atomic(&backup, &raw)?;
        tracing::info!("Invalid catalog preserved at {}", backup.display());
        Ok(())
    }

    /// Read-modify-write the whole catalog under the store lock.
    ///
    /// A missing file starts from an empty catalog. An invalid file is an
    /// error so it is never overwritten without a backup being taken first.
    pub fn modify<T>(&self, f: impl FnOnce(&mut Catalog) -> T) -> Result<T> {
        let _guard = self.guard();
        let mut catalog = match self.read_unlocked() {
            LoadOutcome::Loaded(catalog) => catalog,
            LoadOutcome::Missing => Catalog::new(),
            LoadOutcome::Invalid(reason) => return Err(crate::Error::InvalidCatalog(reason)),
        };
        let output = f(&mut catalog);
        self.write_unlocked(&catalog)?;
        Ok(output)
    }

    /// Set the status (and optionally the resume position) of one entry.
    ///
    /// `Seen` always clears the resume position. Returns `Ok(false)` when no
    /// entry has the given path; nothing is written in that case.
    pub fn update_item_status(
        &self,
        file_path: &str,
        status: WatchStatus,
        resume_position: Option<u64>,
    ) -> Result<bool> {
        let _guard = self.guard();
        let mut catalog = match self.read_unlocked() {
            LoadOutcome::Loaded(catalog) => catalog,
            LoadOutcome::Missing => return Ok(false),
            LoadOutcome::Invalid(reason) => {
                tracing::warn!("Cannot update {}: {}", file_path, reason);
                return Ok(false);
            }
        };

        let Some(watch) = catalog.watch_state_mut(file_path) else {
            tracing::warn!("No catalog entry for {}", file_path);
            return Ok(false);
        };

        match status {
            WatchStatus::Seen => watch.mark_seen(),
            WatchStatus::Unseen => {
                watch.mark_unseen();
                if let Some(position) = resume_position {
                    watch.set_resume_position(position);
                }
            }
        }
        let updated = *watch;

        self.write_unlocked(&catalog)?;
        tracing::debug!(
            "Updated {}: {} (resume {}s)",
            file_path,
            updated.status,
            updated.resume_position
        );
        Ok(true)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_unlocked(&self) -> LoadOutcome {
        if !self.path.exists() {
            return LoadOutcome::Missing;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => return LoadOutcome::Invalid(format!("unreadable: {}", e)),
        };
        let value: Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => return LoadOutcome::Invalid(format!("malformed JSON: {}", e)),
        };
        if !validate(&value) {
            return LoadOutcome::Invalid("unexpected structure".to_string());
        }
        let mut catalog: Catalog = match serde_json::from_value(value) {
            Ok(catalog) => catalog,
            Err(e) => return LoadOutcome::Invalid(format!("bad entry: {}", e)),
        };

        let duplicates = catalog.duplicate_paths();
        if !duplicates.is_empty() {
            return LoadOutcome::Invalid(format!("duplicate paths: {}", duplicates.join(", ")));
        }

        catalog.normalize();
        LoadOutcome::Loaded(catalog)
    }

    fn write_unlocked(&self, catalog: &Catalog) -> Result<()> {
        let mut canonical = catalog.clone();
        canonical.normalize();

        let content = serde_json::to_string_pretty(&canonical)?;
        write_atomic(&self.path, content.as_bytes()).map_err(|e| {
            tracing::error!("Failed to save catalog {}: {}", self.path.display(), e);
            crate::Error::CatalogWrite {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!("Catalog saved to: {}", self.path.display());
        Ok(())
    }
}

/// Structural check of a raw catalog document.
///
/// Requires a root object with a `movies` array and a `series` (or
/// `tv_shows`) collection; every movie and episode must carry a file path.
pub fn validate(data: &Value) -> bool {
    let Some(root) = data.as_object() else {
        return false;
    };

    let movies_ok = match root.get("movies") {
        Some(Value::Array(movies)) => movies.iter().all(has_file_path),
        Some(Value::Object(by_title)) => by_title.values().all(has_file_path),
        _ => false,
    };
    if !movies_ok {
        return false;
    }

    match root.get("series").or_else(|| root.get("tv_shows")) {
        Some(Value::Object(series)) => series.values().all(valid_series_value),
        Some(Value::Array(list)) => list.iter().all(|item| {
            item.get("series_name").map(Value::is_string).unwrap_or(false)
                && item.get("episodes").map(valid_episode_list).unwrap_or(false)
        }),
        _ => false,
    }
}

fn valid_series_value(value: &Value) -> bool {
    match value {
        Value::Array(_) => valid_episode_list(value),
        Value::Object(series) => match series.get("seasons") {
            Some(Value::Object(seasons)) => seasons.values().all(|season| {
                season
                    .get("episodes")
                    .map(valid_episode_list)
                    .unwrap_or(true)
            }),
            _ => false,
        },
        _ => false,
    }
}

fn valid_episode_list(value: &Value) -> bool {
    value
        .as_array()
        .map(|eps| eps.iter().all(|ep| ep.is_object() && has_file_path(ep)))
        .unwrap_or(false)
}

fn has_file_path(entry: &Value) -> bool {
    entry
        .get("file_path")
        .or_else(|| entry.get("filepath"))
        .map(Value::is_string)
        .unwrap_or(false)
}
