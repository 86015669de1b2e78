//! Playlist data models.

use super::catalog::{EpisodeEntry, MovieEntry};

/// What a playlist item refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistKind {
    Movie {
        title: String,
        year: Option<u16>,
    },
    Episode {
        series: String,
        season: u32,
        episode: u32,
    },
}

/// An item scheduled for playback.
///
/// Carries a denormalized copy of the catalog data it was derived from so it
/// can be displayed without consulting the catalog; `file_path` resolves it
/// back to its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    /// Path relative to the media root.
    pub file_path: String,
    /// Movie or episode details.
    pub kind: PlaylistKind,
    /// Seconds to skip when playback starts.
    pub resume_position: u64,
}

impl PlaylistItem {
    pub fn from_movie(movie: &MovieEntry) -> Self {
        Self {
            file_path: movie.file_path.clone(),
            kind: PlaylistKind::Movie {
                title: movie.title.clone(),
                year: movie.year,
            },
            resume_position: movie.watch.resume_position,
        }
    }

    pub fn from_episode(series: &str, episode: &EpisodeEntry) -> Self {
        Self {
            file_path: episode.file_path.clone(),
            kind: PlaylistKind::Episode {
                series: series.to_string(),
                season: episode.season,
                episode: episode.episode,
            },
            resume_position: episode.watch.resume_position,
        }
    }

    pub fn is_episode(&self) -> bool {
        matches!(self.kind, PlaylistKind::Episode { .. })
    }

    /// Title shown in the overlay when the item starts.
    pub fn display_title(&self) -> String {
        match &self.kind {
            PlaylistKind::Movie { title, year: Some(year) } => format!("{} ({})", title, year),
            PlaylistKind::Movie { title, year: None } => title.clone(),
            PlaylistKind::Episode {
                series,
                season,
                episode,
            } => format!("{} - S{:02}E{:02}", series, season, episode),
        }
    }

    /// Shorter label used in the guide list.
    pub fn guide_label(&self) -> String {
        match &self.kind {
            PlaylistKind::Movie { title, .. } => title.clone(),
            PlaylistKind::Episode {
                series,
                season,
                episode,
            } => format!("{} S{:02}E{:02}", series, season, episode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let movie = PlaylistItem::from_movie(&MovieEntry::new("Heat", Some(1995), "Movies/Heat.mkv"));
        assert_eq!(movie.display_title(), "Heat (1995)");
        assert_eq!(movie.guide_label(), "Heat");
        assert!(!movie.is_episode());

        let episode = PlaylistItem::from_episode("Foo", &EpisodeEntry::new(2, 5, "TV_Shows/Foo/e.mkv"));
        assert_eq!(episode.display_title(), "Foo - S02E05");
        assert_eq!(episode.guide_label(), "Foo S02E05");
        assert!(episode.is_episode());
    }
}
