//! Library scanner module.
//!
//! Walks the movies and shows subtrees of a media drive, classifies the
//! video files it finds and merges them into the existing catalog while
//! keeping watch state.

use crate::core::catalog::{CatalogStore, LoadOutcome};
use crate::core::parser::{self, EpisodeContext};
use crate::models::catalog::{Catalog, CatalogEntry, EpisodeEntry, MovieEntry, WatchState};
use crate::models::config::LibraryConfig;
use crate::utils::fs::{ensure_directory, find_child_ignore_case, is_video_file, relative_slash_path};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Path components that mark previews and bonus material.
static EXTRA_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[ ._-])(?:samples?|trailers?|extras?|featurettes?|behind[ ._-]the[ ._-]scenes|deleted[ ._-]scenes)(?:$|[ ._-])",
    )
    .expect("extras regex should compile")
});

/// Counters collected during a scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    /// Files visited in the movies and shows subtrees.
    pub files_seen: usize,
    /// Videos that passed the admission filter.
    pub videos_admitted: usize,
    /// Videos below the minimum size.
    pub rejected_small: usize,
    /// Samples, trailers and extras.
    pub rejected_extras: usize,
    /// Admitted episode files no matcher could number.
    pub unclassified: Vec<String>,
    /// Entries of the previous catalog whose file is gone.
    pub dropped: usize,
}

/// Result of a scan: the merged catalog and what was found.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub catalog: Catalog,
    pub stats: ScanStats,
}

/// Scanner for one media drive.
#[derive(Debug, Clone)]
pub struct LibraryScanner {
    root: PathBuf,
    movies_dir: String,
    shows_dir: String,
    min_size: u64,
}

impl LibraryScanner {
    pub fn new(root: impl Into<PathBuf>, config: &LibraryConfig) -> Self {
        Self {
            root: root.into(),
            movies_dir: config.movies_dir.clone(),
            shows_dir: config.shows_dir.clone(),
            min_size: config.min_video_size_bytes(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discover the drive contents and merge them into `existing`.
    pub fn scan(&self, existing: &Catalog) -> Result<Catalog> {
        Ok(self.scan_detailed(existing)?.catalog)
    }

    /// Like [`scan`](Self::scan) but also returns scan statistics.
    pub fn scan_detailed(&self, existing: &Catalog) -> Result<ScanResult> {
        let (discovered, mut stats) = self.discover()?;
        let (catalog, dropped) = merge(discovered, existing);
        stats.dropped = dropped;
        Ok(ScanResult { catalog, stats })
    }

    /// Scan and persist the merged catalog through `store`.
    ///
    /// An invalid catalog file is backed up and replaced by a fresh scan.
    /// With `rebuild` the existing watch state is discarded.
    pub fn scan_into_store(&self, store: &CatalogStore, rebuild: bool) -> Result<ScanResult> {
        let (discovered, mut stats) = self.discover()?;

        let replace_existing = rebuild
            || match store.load_checked() {
                LoadOutcome::Invalid(reason) => {
                    tracing::warn!("Catalog {} is invalid ({}), rebuilding", store.path().display(), reason);
                    if let Err(e) = store.backup_invalid() {
                        tracing::error!("Failed to back up invalid catalog: {}", e);
                    }
                    true
                }
                LoadOutcome::Loaded(_) | LoadOutcome::Missing => false,
            };

        let catalog = if replace_existing {
            let (catalog, _) = merge(discovered, &Catalog::new());
            store.save(&catalog)?;
            catalog
        } else {
            store.modify(|current| {
                let (merged, dropped) = merge(discovered, current);
                stats.dropped = dropped;
                *current = merged;
                current.clone()
            })?
        };

        tracing::info!(
            "Catalog saved: {} movies, {} series, {} episodes",
            catalog.movie_count(),
            catalog.series_count(),
            catalog.episode_count()
        );

        Ok(ScanResult { catalog, stats })
    }

    /// Build a fresh catalog from disk with default watch state.
    fn discover(&self) -> Result<(Catalog, ScanStats)> {
        ensure_directory(&self.root)?;
        tracing::info!("Scanning media root: {}", self.root.display());

        let mut catalog = Catalog::new();
        catalog.scanned_at = Some(chrono::Utc::now());
        let mut stats = ScanStats::default();

        match find_child_ignore_case(&self.root, &self.movies_dir).filter(|p| p.is_dir()) {
            Some(movies_root) => self.scan_movies(&movies_root, &mut catalog, &mut stats),
            None => tracing::info!("No {} directory on {}", self.movies_dir, self.root.display()),
        }

        match find_child_ignore_case(&self.root, &self.shows_dir).filter(|p| p.is_dir()) {
            Some(shows_root) => self.scan_shows(&shows_root, &mut catalog, &mut stats),
            None => tracing::info!("No {} directory on {}", self.shows_dir, self.root.display()),
        }

        catalog.normalize();

        tracing::info!(
            "Scanned {} files: {} videos admitted, {} too small, {} extras, {} unclassified",
            stats.files_seen,
            stats.videos_admitted,
            stats.rejected_small,
            stats.rejected_extras,
            stats.unclassified.len()
        );

        Ok((catalog, stats))
    }

    fn scan_movies(&self, movies_root: &Path, catalog: &mut Catalog, stats: &mut ScanStats) {
        for entry in sorted_children(movies_root) {
            if entry.is_dir() {
                let dir_name = file_name_of(&entry);
                let largest = self
                    .admitted_videos(&entry, stats)
                    .into_iter()
                    .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));

                let Some((path, _)) = largest else {
                    tracing::debug!("No playable video in {}", entry.display());
                    continue;
                };
                let Some(relative) = relative_slash_path(&self.root, &path) else {
                    continue;
                };

                let parsed = parser::parse_title(&dir_name);
                catalog.insert(CatalogEntry::Movie(MovieEntry::new(parsed.title, parsed.year, relative)));
            } else if entry.is_file() {
                stats.files_seen += 1;
                if !self.admit(&entry, stats) {
                    continue;
                }
                let Some(relative) = relative_slash_path(&self.root, &entry) else {
                    continue;
                };
                let stem = entry
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();

                let parsed = parser::parse_title(&stem);
                catalog.insert(CatalogEntry::Movie(MovieEntry::new(parsed.title, parsed.year, relative)));
            }
        }
    }

    fn scan_shows(&self, shows_root: &Path, catalog: &mut Catalog, stats: &mut ScanStats) {
        for series_dir in sorted_children(shows_root) {
            if !series_dir.is_dir() {
                tracing::debug!("Ignoring loose file in shows directory: {}", series_dir.display());
                continue;
            }

            let series_name = parser::clean_words(&file_name_of(&series_dir));
            if series_name.is_empty() {
                continue;
            }

            let videos = self.admitted_videos(&series_dir, stats);
            let video_count = videos.len();

            for (path, _) in videos {
                let Some(relative) = relative_slash_path(&self.root, &path) else {
                    continue;
                };
                let season_dir = path
                    .parent()
                    .and_then(|parent| relative_slash_path(&series_dir, parent))
                    .unwrap_or_default();
                let file_name = file_name_of(&path);

                let ctx = EpisodeContext {
                    file_name: &file_name,
                    season_dir: &season_dir,
                    videos_in_series: video_count,
                };

                match parser::classify_episode(&ctx) {
                    Some(number) => catalog.insert(CatalogEntry::Episode {
                        series: series_name.clone(),
                        entry: EpisodeEntry::new(number.season, number.episode, relative),
                    }),
                    None => {
                        tracing::info!("Could not classify episode, skipping: {}", relative);
                        stats.unclassified.push(relative);
                    }
                }
            }
        }
    }

    /// Admitted videos below `dir` with their sizes, in path order.
    fn admitted_videos(&self, dir: &Path, stats: &mut ScanStats) -> Vec<(PathBuf, u64)> {
        let mut videos = Vec::new();

        for entry in WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            stats.files_seen += 1;

            let path = entry.path();
            if self.admit(path, stats) {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                videos.push((path.to_path_buf(), size));
            }
        }

        videos
    }

    /// Video-file admission filter: extension, extras, then size.
    fn admit(&self, path: &Path, stats: &mut ScanStats) -> bool {
        if !is_video_file(path) {
            return false;
        }

        let relative = relative_slash_path(&self.root, path).unwrap_or_default();
        if is_extra_content(&relative) {
            tracing::debug!("Skipping extra content: {}", relative);
            stats.rejected_extras += 1;
            return false;
        }

        let size = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                tracing::warn!("Failed to read video file {:?}: {}", path, e);
                return false;
            }
        };
        if size < self.min_size {
            tracing::debug!("Skipping small file ({} bytes): {}", size, relative);
            stats.rejected_small += 1;
            return false;
        }

        stats.videos_admitted += 1;
        true
    }
}

/// Merge freshly discovered entries with the watch state of `existing`.
///
/// Paths present in both keep their status and resume position, new paths
/// start unseen and paths missing from disk are dropped. Returns the merged
/// catalog and the number of dropped entries.
pub fn merge(mut discovered: Catalog, existing: &Catalog) -> (Catalog, usize) {
    let previous: HashMap<String, WatchState> = existing
        .entries()
        .map(|entry| (entry.file_path().to_string(), *entry.watch()))
        .collect();

    for movie in &mut discovered.movies {
        if let Some(watch) = previous.get(&movie.file_path) {
            movie.watch = *watch;
        }
    }
    for episodes in discovered.series.values_mut() {
        for episode in episodes.iter_mut() {
            if let Some(watch) = previous.get(&episode.file_path) {
                episode.watch = *watch;
            }
        }
    }

    let current = discovered.file_paths();
    let dropped = previous.keys().filter(|p| !current.contains(p.as_str())).count();
    if dropped > 0 {
        tracing::info!("{} catalog entries no longer on disk were dropped", dropped);
    }

    discovered.normalize();
    (discovered, dropped)
}

/// Check whether any component of a relative path marks a sample, trailer
/// or extra.
pub fn is_extra_content(relative_path: &str) -> bool {
    relative_path
        .split('/')
        .any(|component| EXTRA_CONTENT.is_match(component))
}

fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    let mut children: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(e) => {
            tracing::warn!("Failed to read directory {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    children.sort();
    children
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
