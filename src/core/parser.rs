//! Filename heuristics.
//!
//! Turns release-style folder and file names into display titles, years and
//! season/episode numbers. Episode detection is an ordered list of
//! independent [`EpisodeMatcher`] strategies; the first one that matches
//! wins.

use once_cell::sync::Lazy;
use regex::Regex;

/// Release tags removed from titles (matched as whole tokens).
const QUALITY_TOKENS: &[&str] = &[
    "2160p", "1080p", "1080i", "720p", "576p", "480p", "4k", "uhd", "hdr", "hdr10", "dv",
    "bluray", "blu-ray", "bdrip", "brrip", "bdremux", "remux", "webrip", "web-dl", "webdl",
    "web", "hdrip", "dvdrip", "dvdscr", "hdtv", "pdtv", "x264", "x265", "h264", "h265",
    "h.264", "h.265", "hevc", "avc", "xvid", "divx", "10bit", "8bit", "aac", "ac3", "eac3",
    "dts", "dts-hd", "truehd", "atmos", "ddp5.1", "dd5.1", "5.1", "7.1", "proper", "repack",
    "extended", "unrated", "remastered", "limited",
];

/// Tags that are also ordinary title words ("Charlotte's Web"). They only
/// count as release junk next to another tag.
const AMBIGUOUS_TOKENS: &[&str] = &[
    "web", "uhd", "hdr", "dv", "4k", "proper", "repack", "extended", "unrated", "remastered",
    "limited",
];

static BRACKETED_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[]((?:19|20)\d{2})[\)\]]").expect("year regex should compile"));

static BARE_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[\s._-])((?:19|20)\d{2})(?:$|[\s._-])").expect("year regex should compile")
});

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}").expect("bracket regex should compile"));

static QUALITY: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = QUALITY_TOKENS.iter().map(|t| regex::escape(t)).collect();
    Regex::new(&format!(
        r"(?i)(?:^|[\s._\-\[\(])({})(?:$|[\s._\-\]\)])",
        alternatives.join("|")
    ))
    .expect("quality regex should compile")
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex should compile"));

static SEASON_EPISODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])s(\d{1,2})[ ._-]?e(\d{1,3})(?:[^0-9]|$)")
        .expect("episode regex should compile")
});

static CROSS_EPISODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9a-z])(\d{1,2})x(\d{1,3})(?:[^0-9]|$)")
        .expect("episode regex should compile")
});

static SEASON_DIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(?:season|s)[ ._-]?(\d{1,2})(?:[^0-9]|$)")
        .expect("season regex should compile")
});

static EPISODE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])(?:episode|ep|e)[ ._-]?(\d{1,3})(?:[^0-9]|$)")
        .expect("episode regex should compile")
});

/// Title and year extracted from a release name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    pub title: String,
    pub year: Option<u16>,
}

/// Clean a folder name or file stem into a display title and optional year.
///
/// The chosen year and anything after it are dropped. Before the year,
/// release junk starts at the first unambiguous tag or the first run of two
/// adjacent tags. Bracketed tags are removed, `.`/`_` become spaces and
/// every word is capitalized.
pub fn parse_title(name: &str) -> ParsedTitle {
    let name = name.trim();
    let (year, year_cut) = find_year(name);

    let end = year_cut.unwrap_or(name.len());
    let region = &name[..end];
    let cut = release_junk_start(region, &find_tags(region)).unwrap_or(end);

    let mut title = clean_words(&name[..cut]);
    if title.is_empty() {
        title = clean_words(&strip_tags(name, &find_tags(name)));
    }
    if title.is_empty() {
        title = name.to_string();
    }

    ParsedTitle { title, year }
}

/// A release tag found in a name.
#[derive(Debug, Clone, Copy)]
struct Tag {
    start: usize,
    end: usize,
    ambiguous: bool,
}

/// Every release tag in `text`, in order. Delimiters are shared between
/// neighbours, so `.1080p.BluRay.` yields both tags.
fn find_tags(text: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut pos = 0;
    while let Some(token) = QUALITY.captures_at(text, pos).and_then(|caps| caps.get(1)) {
        tags.push(Tag {
            start: token.start(),
            end: token.end(),
            ambiguous: AMBIGUOUS_TOKENS
                .iter()
                .any(|word| word.eq_ignore_ascii_case(token.as_str())),
        });
        pos = token.end();
    }
    tags
}

fn release_junk_start(text: &str, tags: &[Tag]) -> Option<usize> {
    tags.iter().enumerate().find_map(|(i, tag)| {
        let starts_run = tags
            .get(i + 1)
            .map(|next| text[tag.end..next.start].chars().all(is_tag_separator))
            .unwrap_or(false);
        (!tag.ambiguous || starts_run).then_some(tag.start)
    })
}

fn strip_tags(text: &str, tags: &[Tag]) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut last = 0;
    for tag in tags {
        stripped.push_str(&text[last..tag.start]);
        stripped.push(' ');
        last = tag.end;
    }
    stripped.push_str(&text[last..]);
    stripped
}

fn is_tag_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | '_' | '-' | '[' | ']' | '(' | ')')
}

/// Locate the release year and the byte offset where the title ends.
fn find_year(name: &str) -> (Option<u16>, Option<usize>) {
    if let Some(caps) = BRACKETED_YEAR.captures(name) {
        if let (Some(whole), Some(year)) = (caps.get(0), caps.get(1)) {
            return (year.as_str().parse().ok(), Some(whole.start()));
        }
    }

    for caps in BARE_YEAR.captures_iter(name) {
        let Some(year) = caps.get(1) else { continue };
        if year.start() == 0 {
            // "2001 A Space Odyssey": a leading year is part of the title.
            if year.end() == name.len() {
                return (year.as_str().parse().ok(), None);
            }
            continue;
        }
        return (year.as_str().parse().ok(), Some(year.start()));
    }

    (None, None)
}

/// Strip bracketed tags, turn separators into spaces and capitalize words.
pub fn clean_words(raw: &str) -> String {
    let without_tags = BRACKETED.replace_all(raw, " ");
    let spaced = without_tags.replace(['.', '_'], " ");
    let collapsed = WHITESPACE.replace_all(&spaced, " ");
    let trimmed =
        collapsed.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ',' | '[' | '('));

    trimmed
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Season and episode number of an episode file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeNumber {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeNumber {
    /// Both numbers must be at least 1.
    fn checked(season: u32, episode: u32) -> Option<Self> {
        (season >= 1 && episode >= 1).then_some(Self { season, episode })
    }
}

/// What an episode matcher gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeContext<'a> {
    /// File name including extension.
    pub file_name: &'a str,
    /// Directory of the file relative to the series root ("" at the root).
    pub season_dir: &'a str,
    /// Number of admitted videos in the whole series.
    pub videos_in_series: usize,
}

impl EpisodeContext<'_> {
    pub fn in_series_root(&self) -> bool {
        self.season_dir.is_empty()
    }
}

/// One episode-numbering heuristic.
pub trait EpisodeMatcher {
    fn name(&self) -> &'static str;

    /// A definitive match, or `None` to let the next matcher try.
    fn match_episode(&self, ctx: &EpisodeContext<'_>) -> Option<EpisodeNumber>;
}

/// `S01E02`, `s1e2`, `S01.E02` or `1x02` in the file name.
pub struct SeasonEpisodeToken;

impl EpisodeMatcher for SeasonEpisodeToken {
    fn name(&self) -> &'static str {
        "season-episode token"
    }

    fn match_episode(&self, ctx: &EpisodeContext<'_>) -> Option<EpisodeNumber> {
        [&*SEASON_EPISODE, &*CROSS_EPISODE]
            .iter()
            .find_map(|re| {
                let caps = re.captures(ctx.file_name)?;
                let season = caps.get(1)?.as_str().parse().ok()?;
                let episode = caps.get(2)?.as_str().parse().ok()?;
                EpisodeNumber::checked(season, episode)
            })
    }
}

/// Season from a `Season 02` / `S2` directory (default 1), episode from an
/// `E05` / `EP05` / `Episode 5` token in the file name.
pub struct SeasonDirEpisodeFile;

impl EpisodeMatcher for SeasonDirEpisodeFile {
    fn name(&self) -> &'static str {
        "season directory + episode token"
    }

    fn match_episode(&self, ctx: &EpisodeContext<'_>) -> Option<EpisodeNumber> {
        let episode: u32 = EPISODE_TOKEN
            .captures(ctx.file_name)?
            .get(1)?
            .as_str()
            .parse()
            .ok()?;

        let season = match SEASON_DIR.captures(ctx.season_dir) {
            Some(caps) => caps.get(1)?.as_str().parse().ok()?,
            None => 1,
        };

        EpisodeNumber::checked(season, episode)
    }
}

/// A series consisting of a single file directly in its folder is treated as
/// a one-episode series (specials, documentaries).
pub struct SoleVideoInSeriesRoot;

impl EpisodeMatcher for SoleVideoInSeriesRoot {
    fn name(&self) -> &'static str {
        "sole video in series root"
    }

    fn match_episode(&self, ctx: &EpisodeContext<'_>) -> Option<EpisodeNumber> {
        (ctx.in_series_root() && ctx.videos_in_series == 1).then_some(EpisodeNumber {
            season: 1,
            episode: 1,
        })
    }
}

/// Matchers in priority order.
pub static EPISODE_MATCHERS: &[&(dyn EpisodeMatcher + Sync)] =
    &[&SeasonEpisodeToken, &SeasonDirEpisodeFile, &SoleVideoInSeriesRoot];

/// Run the matchers in order and return the first match.
pub fn classify_episode(ctx: &EpisodeContext<'_>) -> Option<EpisodeNumber> {
    EPISODE_MATCHERS.iter().find_map(|matcher| {
        let found = matcher.match_episode(ctx)?;
        tracing::trace!("{} matched by {}", ctx.file_name, matcher.name());
        Some(found)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(file_name: &'a str, season_dir: &'a str, videos: usize) -> EpisodeContext<'a> {
        EpisodeContext {
            file_name,
            season_dir,
            videos_in_series: videos,
        }
    }

    #[test]
    fn test_parse_release_name() {
        let parsed = parse_title("Movie.Title.2019.1080p.BluRay.x264");
        assert_eq!(parsed.title, "Movie Title");
        assert_eq!(parsed.year, Some(2019));
    }

    #[test]
    fn test_parse_parenthesized_year() {
        let parsed = parse_title("The Matrix (1999)");
        assert_eq!(parsed.title, "The Matrix");
        assert_eq!(parsed.year, Some(1999));

        let parsed = parse_title("1917 (2019)");
        assert_eq!(parsed.title, "1917");
        assert_eq!(parsed.year, Some(2019));
    }

    #[test]
    fn test_parse_leading_year_kept_in_title() {
        let parsed = parse_title("2001 A Space Odyssey");
        assert_eq!(parsed.title, "2001 A Space Odyssey");
        assert_eq!(parsed.year, None);
    }

    #[test]
    fn test_parse_tags_and_separators() {
        let parsed = parse_title("[GRP] some_movie_name 720p");
        assert_eq!(parsed.title, "Some Movie Name");
        assert_eq!(parsed.year, None);

        let parsed = parse_title("heat");
        assert_eq!(parsed.title, "Heat");
    }

    #[test]
    fn test_title_words_that_look_like_tags() {
        assert_eq!(parse_title("Charlotte's Web (2006)").title, "Charlotte's Web");
        assert_eq!(parse_title("Web of Lies (2010)").title, "Web Of Lies");
        assert_eq!(parse_title("The Limited").title, "The Limited");
    }

    #[test]
    fn test_tag_runs_end_the_title() {
        assert_eq!(parse_title("The.Movie.EXTENDED.REMASTERED").title, "The Movie");
        assert_eq!(parse_title("The.Movie.EXTENDED.1080p.x264").title, "The Movie");
        assert_eq!(parse_title("Some.Film.WEB-DL.x264").title, "Some Film");
        assert_eq!(parse_title("Movie [1080p]").title, "Movie");
    }

    #[test]
    fn test_only_tags_falls_back() {
        assert_eq!(parse_title("1080p.x264").title, "1080p.x264");
        assert_eq!(parse_title("1080p.Heat").title, "Heat");
    }

    #[test]
    fn test_season_episode_token() {
        let m = SeasonEpisodeToken;
        assert_eq!(
            m.match_episode(&ctx("Test.Show.S01E02.mp4", "", 5)),
            Some(EpisodeNumber { season: 1, episode: 2 })
        );
        assert_eq!(
            m.match_episode(&ctx("show 3x10 title.mkv", "", 5)),
            Some(EpisodeNumber { season: 3, episode: 10 })
        );
        assert_eq!(m.match_episode(&ctx("Show.1080p.x264.mkv", "", 5)), None);
        assert_eq!(m.match_episode(&ctx("Show.S00E01.mkv", "", 5)), None);
    }

    #[test]
    fn test_season_dir_episode_file() {
        let m = SeasonDirEpisodeFile;
        assert_eq!(
            m.match_episode(&ctx("Foo.E05.mkv", "Season 02", 5)),
            Some(EpisodeNumber { season: 2, episode: 5 })
        );
        assert_eq!(
            m.match_episode(&ctx("Episode 7.mkv", "", 5)),
            Some(EpisodeNumber { season: 1, episode: 7 })
        );
        assert_eq!(m.match_episode(&ctx("Pilot.mkv", "Season 1", 5)), None);
    }

    #[test]
    fn test_sole_video_in_series_root() {
        let m = SoleVideoInSeriesRoot;
        assert!(m.match_episode(&ctx("Documentary.mkv", "", 1)).is_some());
        assert!(m.match_episode(&ctx("Documentary.mkv", "", 2)).is_none());
        assert!(m.match_episode(&ctx("Documentary.mkv", "Extras", 1)).is_none());
    }

    #[test]
    fn test_classify_priority() {
        // The explicit token beats the season folder.
        assert_eq!(
            classify_episode(&ctx("Foo.S03E04.mkv", "Season 01", 1)),
            Some(EpisodeNumber { season: 3, episode: 4 })
        );
        assert_eq!(classify_episode(&ctx("Random.mkv", "Season 01", 3)), None);
    }
}
