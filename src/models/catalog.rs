//! Catalog data models.
//!
//! The catalog is the only durable state of the kiosk: every movie and
//! episode found on the media drive together with its watch status and
//! resume position. Paths are relative to the media root and use `/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Current catalog schema version.
pub const CATALOG_VERSION: u32 = 1;

/// Watch status of a catalog entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WatchStatus {
    #[default]
    Unseen,
    Seen,
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchStatus::Unseen => write!(f, "Unseen"),
            WatchStatus::Seen => write!(f, "Seen"),
        }
    }
}

/// Status and resume position shared by movies and episodes.
///
/// Invariant: a `Seen` entry always has a resume position of 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchState {
    #[serde(default)]
    pub status: WatchStatus,
    /// Seconds into the file at which playback restarts.
    #[serde(default, deserialize_with = "deserialize_resume_position")]
    pub resume_position: u64,
}

impl WatchState {
    /// Mark as seen and clear the resume position.
    pub fn mark_seen(&mut self) {
        self.status = WatchStatus::Seen;
        self.resume_position = 0;
    }

    /// Mark as unseen, keeping the resume position.
    pub fn mark_unseen(&mut self) {
        self.status = WatchStatus::Unseen;
    }

    /// Record a resume position. Ignored for seen entries.
    pub fn set_resume_position(&mut self, seconds: u64) {
        if self.status == WatchStatus::Unseen {
            self.resume_position = seconds;
        }
    }

    pub fn is_unseen(&self) -> bool {
        self.status == WatchStatus::Unseen
    }

    /// Re-establish the seen-implies-zero invariant.
    pub fn normalize(&mut self) {
        if self.status == WatchStatus::Seen {
            self.resume_position = 0;
        }
    }
}

/// Accepts null, integer or fractional seconds.
fn deserialize_resume_position<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(|v| v.floor() as u64)
        .unwrap_or(0))
}

/// A movie in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieEntry {
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Release year, if the folder or file name carried one.
    #[serde(default)]
    pub year: Option<u16>,
    /// Path relative to the media root (unique key).
    #[serde(alias = "filepath")]
    pub file_path: String,
    #[serde(flatten)]
    pub watch: WatchState,
}

impl MovieEntry {
    pub fn new(title: impl Into<String>, year: Option<u16>, file_path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            year,
            file_path: file_path.into(),
            watch: WatchState::default(),
        }
    }
}

/// An episode of a series in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeEntry {
    /// Season number (>= 1).
    pub season: u32,
    /// Episode number (>= 1).
    pub episode: u32,
    /// Path relative to the media root (unique key).
    #[serde(alias = "filepath")]
    pub file_path: String,
    #[serde(flatten)]
    pub watch: WatchState,
}

impl EpisodeEntry {
    pub fn new(season: u32, episode: u32, file_path: impl Into<String>) -> Self {
        Self {
            season,
            episode,
            file_path: file_path.into(),
            watch: WatchState::default(),
        }
    }

    /// Sort key within a series.
    pub fn order_key(&self) -> (u32, u32, &str) {
        (self.season, self.episode, self.file_path.as_str())
    }
}

/// A single catalog record, either a movie or an episode of a named series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    Movie(MovieEntry),
    Episode { series: String, entry: EpisodeEntry },
}

impl CatalogEntry {
    pub fn file_path(&self) -> &str {
        match self {
            CatalogEntry::Movie(movie) => &movie.file_path,
            CatalogEntry::Episode { entry, .. } => &entry.file_path,
        }
    }

    pub fn watch(&self) -> &WatchState {
        match self {
            CatalogEntry::Movie(movie) => &movie.watch,
            CatalogEntry::Episode { entry, .. } => &entry.watch,
        }
    }

    pub fn watch_mut(&mut self) -> &mut WatchState {
        match self {
            CatalogEntry::Movie(movie) => &mut movie.watch,
            CatalogEntry::Episode { entry, .. } => &mut entry.watch,
        }
    }

    /// Human readable label, e.g. "The Matrix (1999)" or "Foo - S01E02".
    pub fn display_title(&self) -> String {
        match self {
            CatalogEntry::Movie(movie) => match movie.year {
                Some(year) => format!("{} ({})", movie.title, year),
                None => movie.title.clone(),
            },
            CatalogEntry::Episode { series, entry } => {
                format!("{} - S{:02}E{:02}", series, entry.season, entry.episode)
            }
        }
    }
}

/// The full catalog of a media drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// When the catalog was last rebuilt from disk.
    #[serde(default)]
    pub scanned_at: Option<DateTime<Utc>>,
    /// All movies, ordered by file path.
    #[serde(default, deserialize_with = "deserialize_movies")]
    pub movies: Vec<MovieEntry>,
    /// Episodes grouped by series name, each list ordered by (season, episode).
    #[serde(default, alias = "tv_shows", deserialize_with = "deserialize_series")]
    pub series: BTreeMap<String, Vec<EpisodeEntry>>,
}

fn default_version() -> u32 {
    CATALOG_VERSION
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            version: CATALOG_VERSION,
            scanned_at: None,
            movies: Vec::new(),
            series: BTreeMap::new(),
        }
    }
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the catalog holds no movies and no episodes.
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && self.series.values().all(|eps| eps.is_empty())
    }

    pub fn movie_count(&self) -> usize {
        self.movies.len()
    }

    pub fn series_count(&self) -> usize {
        self.series.values().filter(|eps| !eps.is_empty()).count()
    }

    pub fn episode_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.movie_count() + self.episode_count()
    }

    /// Iterate over every entry as an owned [`CatalogEntry`].
    pub fn entries(&self) -> impl Iterator<Item = CatalogEntry> + '_ {
        let movies = self.movies.iter().cloned().map(CatalogEntry::Movie);
        let episodes = self.series.iter().flat_map(|(name, eps)| {
            eps.iter().map(move |ep| CatalogEntry::Episode {
                series: name.clone(),
                entry: ep.clone(),
            })
        });
        movies.chain(episodes)
    }

    /// Find an entry by relative file path across movies and series.
    pub fn find(&self, file_path: &str) -> Option<CatalogEntry> {
        if let Some(movie) = self.movies.iter().find(|m| m.file_path == file_path) {
            return Some(CatalogEntry::Movie(movie.clone()));
        }
        self.series.iter().find_map(|(name, eps)| {
            eps.iter()
                .find(|ep| ep.file_path == file_path)
                .map(|ep| CatalogEntry::Episode {
                    series: name.clone(),
                    entry: ep.clone(),
                })
        })
    }

    /// Watch state of the entry at `file_path`.
    pub fn watch_state(&self, file_path: &str) -> Option<WatchState> {
        self.find(file_path).map(|entry| *entry.watch())
    }

    /// Mutable watch state of the entry at `file_path`.
    pub fn watch_state_mut(&mut self, file_path: &str) -> Option<&mut WatchState> {
        if let Some(movie) = self.movies.iter_mut().find(|m| m.file_path == file_path) {
            return Some(&mut movie.watch);
        }
        self.series
            .values_mut()
            .flat_map(|eps| eps.iter_mut())
            .find(|ep| ep.file_path == file_path)
            .map(|ep| &mut ep.watch)
    }

    /// Add an entry. Callers are responsible for path uniqueness.
    pub fn insert(&mut self, entry: CatalogEntry) {
        match entry {
            CatalogEntry::Movie(movie) => self.movies.push(movie),
            CatalogEntry::Episode { series, entry } => {
                self.series.entry(series).or_default().push(entry)
            }
        }
    }

    /// Set of every relative path in the catalog.
    pub fn file_paths(&self) -> HashSet<&str> {
        self.movies
            .iter()
            .map(|m| m.file_path.as_str())
            .chain(
                self.series
                    .values()
                    .flat_map(|eps| eps.iter().map(|ep| ep.file_path.as_str())),
            )
            .collect()
    }

    /// Paths that occur more than once.
    pub fn duplicate_paths(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for entry in self.entries() {
            let path = entry.file_path().to_string();
            if !seen.insert(path.clone()) && !duplicates.contains(&path) {
                duplicates.push(path);
            }
        }
        duplicates
    }

    /// Sort movies and episodes canonically, drop empty series and restore
    /// the seen-implies-zero invariant.
    pub fn normalize(&mut self) {
        self.movies.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        for movie in &mut self.movies {
            movie.watch.normalize();
        }
        self.series.retain(|_, eps| !eps.is_empty());
        for eps in self.series.values_mut() {
            eps.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
            for ep in eps.iter_mut() {
                ep.watch.normalize();
            }
        }
    }
}

// Legacy layouts written by earlier builds of the kiosk software.

#[derive(Deserialize)]
#[serde(untagged)]
enum MoviesLayout {
    List(Vec<MovieEntry>),
    ByTitle(BTreeMap<String, TitledMovie>),
}

#[derive(Deserialize)]
struct TitledMovie {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<u16>,
    #[serde(alias = "filepath")]
    file_path: String,
    #[serde(flatten)]
    watch: WatchState,
}

fn deserialize_movies<'de, D>(deserializer: D) -> Result<Vec<MovieEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match MoviesLayout::deserialize(deserializer)? {
        MoviesLayout::List(movies) => movies,
        MoviesLayout::ByTitle(map) => map
            .into_iter()
            .map(|(key, movie)| MovieEntry {
                title: movie.title.unwrap_or(key),
                year: movie.year,
                file_path: movie.file_path,
                watch: movie.watch,
            })
            .collect(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesLayout {
    Flat(BTreeMap<String, Vec<EpisodeEntry>>),
    Seasons(BTreeMap<String, SeasonedSeries>),
    List(Vec<NamedSeries>),
}

#[derive(Deserialize)]
struct SeasonedSeries {
    seasons: BTreeMap<String, SeasonRecord>,
}

#[derive(Deserialize)]
struct SeasonRecord {
    #[serde(default)]
    episodes: Vec<EpisodeEntry>,
}

#[derive(Deserialize)]
struct NamedSeries {
    series_name: String,
    #[serde(default)]
    episodes: Vec<EpisodeEntry>,
}

fn deserialize_series<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<EpisodeEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SeriesLayout::deserialize(deserializer)? {
        SeriesLayout::Flat(map) => map,
        SeriesLayout::Seasons(map) => map
            .into_iter()
            .map(|(name, series)| {
                let episodes = series
                    .seasons
                    .into_values()
                    .flat_map(|season| season.episodes)
                    .collect();
                (name, episodes)
            })
            .collect(),
        SeriesLayout::List(list) => {
            let mut map: BTreeMap<String, Vec<EpisodeEntry>> = BTreeMap::new();
            for series in list {
                map.entry(series.series_name).or_default().extend(series.episodes);
            }
            map
        }
    })
}
