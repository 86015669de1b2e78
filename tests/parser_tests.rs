//! Integration tests for filename heuristics.
//!
//! Tests cover:
//! - Title and year extraction from folder names and release file names
//! - Episode numbering across the matcher cascade

use media_kiosk::core::parser::{classify_episode, parse_title, EpisodeContext, EpisodeNumber};

fn title(name: &str) -> (String, Option<u16>) {
    let parsed = parse_title(name);
    (parsed.title, parsed.year)
}

fn episode(file_name: &str, season_dir: &str) -> Option<(u32, u32)> {
    classify_episode(&EpisodeContext {
        file_name,
        season_dir,
        videos_in_series: 10,
    })
    .map(|EpisodeNumber { season, episode }| (season, episode))
}

// ========== TITLES ==========

#[test]
fn test_release_names() {
    let cases = [
        ("Movie.Title.2019.1080p.BluRay.x264", "Movie Title", Some(2019)),
        ("The Matrix (1999)", "The Matrix", Some(1999)),
        ("Blade_Runner_2049_(2017)_2160p", "Blade Runner 2049", Some(2017)),
        ("Inception [2010] [1080p]", "Inception", Some(2010)),
        ("the.dark.knight.2008.720p.webrip", "The Dark Knight", Some(2008)),
        ("Amelie", "Amelie", None),
        ("Heat.1995.REMASTERED.1080p", "Heat", Some(1995)),
    ];

    for (name, expected_title, expected_year) in cases {
        assert_eq!(title(name), (expected_title.to_string(), expected_year), "{}", name);
    }
}

#[test]
fn test_year_like_titles() {
    assert_eq!(title("1917 (2019)"), ("1917".to_string(), Some(2019)));
    assert_eq!(title("2001 A Space Odyssey"), ("2001 A Space Odyssey".to_string(), None));
    assert_eq!(
        title("2001.A.Space.Odyssey.1968.1080p"),
        ("2001 A Space Odyssey".to_string(), Some(1968))
    );
}

#[test]
fn test_titles_containing_tag_words() {
    assert_eq!(title("Charlotte's Web (2006)"), ("Charlotte's Web".to_string(), Some(2006)));
    assert_eq!(title("Web of Lies (2010)"), ("Web Of Lies".to_string(), Some(2010)));
    assert_eq!(title("Limited Partners"), ("Limited Partners".to_string(), None));
    assert_eq!(
        title("The.Thing.EXTENDED.PROPER.720p"),
        ("The Thing".to_string(), None)
    );
    assert_eq!(title("Some.Film.WEB-DL.x264"), ("Some Film".to_string(), None));
}

// ========== EPISODES ==========

#[test]
fn test_episode_tokens() {
    assert_eq!(episode("Show.Name.S02E10.720p.mkv", ""), Some((2, 10)));
    assert_eq!(episode("show.name.s1e3.mkv", "Season 5"), Some((1, 3)));
    assert_eq!(episode("Show Name - 4x07 - Title.mkv", ""), Some((4, 7)));
    assert_eq!(episode("Foo.E05.mkv", "Season 02"), Some((2, 5)));
    assert_eq!(episode("Foo EP12.mkv", "S3"), Some((3, 12)));
    assert_eq!(episode("Episode 4.mkv", "Specials"), Some((1, 4)));
}

#[test]
fn test_unclassifiable_episodes() {
    assert_eq!(episode("Behind it all.mkv", "Season 1"), None);
    assert_eq!(episode("Show.1080p.x265.mkv", ""), None);
    assert_eq!(episode("Show.S01E00.mkv", ""), None);
}
