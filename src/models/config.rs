//! Configuration model.
//!
//! Two layers: the host [`Config`] (where to look for the drive, how to scan
//! it, how to drive the player) and the per-drive [`VolumeSettings`] stored
//! next to the catalog on the media drive itself.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-drive settings file.
pub const VOLUME_SETTINGS_FILE: &str = "config.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Media drive discovery.
    pub volume: VolumeConfig,
    /// Library layout and scanning.
    pub library: LibraryConfig,
    /// Player and orchestration timing.
    pub playback: PlaybackConfig,
}

/// Media drive discovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// File or directory name identifying the media drive.
    pub marker: String,
    /// Explicit media root; skips discovery when set.
    pub media_root: Option<PathBuf>,
    /// Additional directories whose children are candidate drives.
    pub search_roots: Vec<PathBuf>,
    /// Program and arguments run before each discovery attempt.
    pub mount_command: Option<Vec<String>>,
    /// Seconds between discovery attempts.
    pub retry_interval_secs: u64,
}

/// Library layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Catalog file name at the media root.
    pub catalog_file: String,
    /// Movies subtree name.
    pub movies_dir: String,
    /// TV shows subtree name.
    pub shows_dir: String,
    /// Files below this size are treated as previews.
    pub min_video_size_mb: u64,
    /// Merge a fresh scan into the catalog every time the drive is mounted.
    pub rescan_on_mount: bool,
}

/// Player and orchestration configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// mpv executable.
    pub mpv_path: String,
    /// Start the player fullscreen.
    pub fullscreen: bool,
    /// How often drive presence is re-checked during playback.
    pub connection_check_interval_ms: u64,
    /// How often the resume position is checkpointed during playback.
    pub resume_checkpoint_secs: u64,
    /// Pause before looking for media again when nothing is left to play.
    pub empty_playlist_cooldown_secs: u64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            marker: "Movies".to_string(),
            media_root: None,
            search_roots: Vec::new(),
            mount_command: None,
            retry_interval_secs: 5,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            catalog_file: "media_library.json".to_string(),
            movies_dir: "Movies".to_string(),
            shows_dir: "TV_Shows".to_string(),
            min_video_size_mb: 50,
            rescan_on_mount: true,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            mpv_path: "mpv".to_string(),
            fullscreen: true,
            connection_check_interval_ms: 1000,
            resume_checkpoint_secs: 30,
            empty_playlist_cooldown_secs: 10,
        }
    }
}

impl VolumeConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs.max(1))
    }
}

impl LibraryConfig {
    pub fn min_video_size_bytes(&self) -> u64 {
        self.min_video_size_mb.saturating_mul(1024 * 1024)
    }

    /// Catalog location on a media drive.
    pub fn catalog_path(&self, media_root: &Path) -> PathBuf {
        media_root.join(&self.catalog_file)
    }
}

impl PlaybackConfig {
    pub fn connection_check_interval(&self) -> Duration {
        Duration::from_millis(self.connection_check_interval_ms.max(1))
    }

    /// `None` disables checkpointing.
    pub fn resume_checkpoint_interval(&self) -> Option<Duration> {
        (self.resume_checkpoint_secs > 0).then(|| Duration::from_secs(self.resume_checkpoint_secs))
    }

    pub fn empty_playlist_cooldown(&self) -> Duration {
        Duration::from_secs(self.empty_playlist_cooldown_secs)
    }
}

/// Per-drive settings stored at the media root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSettings {
    pub ui: UiSettings,
    pub player: PlayerSettings,
}

/// On-screen display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Seconds the title overlay stays visible.
    pub title_overlay_secs: u64,
    /// Items per guide page.
    pub guide_page_size: usize,
}

/// Audio settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Initial and unmute volume (0-100).
    pub volume_default: u8,
    /// Volume change per step.
    pub volume_step: u8,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            title_overlay_secs: 5,
            guide_page_size: 10,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            volume_default: 70,
            volume_step: 5,
        }
    }
}

impl VolumeSettings {
    /// Load the settings file of a media drive, writing defaults when it is
    /// missing. Never fails: unreadable or malformed files yield defaults.
    pub fn load_or_create(media_root: &Path) -> Self {
        let path = media_root.join(VOLUME_SETTINGS_FILE);

        if !path.exists() {
            let settings = VolumeSettings::default();
            match toml::to_string_pretty(&settings) {
                Ok(content) => match crate::utils::fs::write_atomic(&path, content.as_bytes()) {
                    Ok(()) => tracing::info!("Default drive settings written to {}", path.display()),
                    Err(e) => tracing::warn!("Could not write {}: {}", path.display(), e),
                },
                Err(e) => tracing::warn!("Could not serialize default drive settings: {}", e),
            }
            return settings;
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<VolumeSettings>(&content) {
                Ok(settings) => settings.sanitized(),
                Err(e) => {
                    tracing::error!("Invalid {}: {}. Using defaults.", path.display(), e);
                    VolumeSettings::default()
                }
            },
            Err(e) => {
                tracing::error!("Failed to read {}: {}. Using defaults.", path.display(), e);
                VolumeSettings::default()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        self.player.volume_default = self.player.volume_default.min(100);
        self.player.volume_step = self.player.volume_step.clamp(1, 100);
        self.ui.guide_page_size = self.ui.guide_page_size.max(1);
        self
    }

    pub fn title_overlay_duration(&self) -> Duration {
        Duration::from_secs(self.ui.title_overlay_secs)
    }
}

/// Get the configuration directory path.
fn dirs_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("media_kiosk")
}

/// Default host configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs_config_path().join("config.toml")
}

/// Load configuration.
///
/// An explicitly given file must exist and parse. The default file is
/// optional and falls back to defaults when it is malformed.
pub fn load_config(explicit: Option<&Path>) -> crate::Result<Config> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))?;
        return toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)));
    }

    let config_path = default_config_path();
    if config_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match toml::from_str(&content) {
                Ok(config) => return Ok(config),
                Err(e) => tracing::warn!("Ignoring invalid {}: {}", config_path.display(), e),
            }
        }
    }

    Ok(Config::default())
}
