//! Platform URL classification.
//!
//! Decides whether a string is a Vimeo reference and pulls the numeric
//! video id out of it. Patterns are tried in declaration order and the
//! first one that matches wins, even when a later pattern would be more
//! specific. Callers rely on that ordering being stable.
//!
//! # Example
//!
//! ```
//! use vimeo_scraper::classifier;
//!
//! assert!(classifier::is_recognized("https://vimeo.com/channels/staffpicks/76979871"));
//! let id = classifier::extract_video_id("https://player.vimeo.com/video/76979871?h=abc").unwrap();
//! assert_eq!(id.get(), 76_979_871);
//! ```

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Base of the embeddable player page; the video id is appended.
pub const PLAYER_URL: &str = "https://player.vimeo.com/video/";

const PLAYER_HOST: &str = "player.vimeo.com";

/// Recognised reference forms, in match order.
const PATTERNS: &[&str] = &[
    // Bare numeric id, as found in embed snippets
    r"^\s*(\d+)\s*$",
    // vimeo.com/{id}, channels/{name}/{id}, groups/{name}/videos/{id}, video/{id}
    // on www., player. or the bare host, scheme and trailing query optional
    r"(?:(?:https?:)?//)?(?:www\.|player\.)?\bvimeo\.com/(?:channels/(?:\w+/)?|groups/([^/]*)/videos/|video/|)(\d+)(?:/?\?\S*)?",
    // showcase and album paths ending in a long id
    r"(?:https?://)?(?:www\.)?(?:player\.)?\bvimeo\.com/?(?:showcase/)*(?:[0-9a-z]*/)*([0-9]{6,11})(?:\?.*)?",
    // embed/, v/ and watch?v= forms
    r"(?:https?:)?//(?:player\.|www\.)?\bvimeo\.com/(?:video/|embed/|watch\?\S*v=|v/)?(\d+)",
];

static COMPILED: Lazy<Vec<(usize, Regex)>> = Lazy::new(|| {
    PATTERNS
        .iter()
        .enumerate()
        .filter_map(|(index, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((index, re)),
            Err(e) => {
                warn!("Skipping URL pattern {}: {}", index, e);
                None
            }
        })
        .collect()
});

/// Numeric Vimeo video identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VideoId(u64);

impl VideoId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Canonical player page for this video.
    #[must_use]
    pub fn player_url(self) -> String {
        format!("{PLAYER_URL}{}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Details of the winning pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlMatch {
    /// Index of the pattern that matched, in declaration order.
    pub pattern: usize,
    /// Full matched text.
    pub matched: String,
    /// Capture groups 1.., `None` where a group did not participate.
    pub groups: Vec<Option<String>>,
}

impl UrlMatch {
    /// Last capture group that took part in the match.
    #[must_use]
    pub fn last_group(&self) -> Option<&str> {
        self.groups.iter().rev().find_map(Option::as_deref)
    }

    /// The last group parsed as a base-10 id; `None` when it is not a number.
    #[must_use]
    pub fn video_id(&self) -> Option<VideoId> {
        self.last_group()?.parse::<u64>().ok().map(VideoId)
    }
}

/// Returns `true` when any pattern matches.
pub fn is_recognized(input: &str) -> bool {
    match_details(input).is_some()
}

/// Run the pattern table against `input` and report the first match.
pub fn match_details(input: &str) -> Option<UrlMatch> {
    if input.trim().is_empty() {
        return None;
    }

    COMPILED.iter().find_map(|(index, re)| {
        let caps = re.captures(input)?;
        Some(UrlMatch {
            pattern: *index,
            matched: caps.get(0).map(|m| m.as_str().to_string()).unwrap_or_default(),
            groups: caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        })
    })
}

/// Video id carried by `input`, if it is a recognised reference.
pub fn extract_video_id(input: &str) -> Option<VideoId> {
    match_details(input)?.video_id()
}

/// Whether `input` is an absolute URL on the embeddable player host.
pub fn is_player_url(input: &str) -> bool {
    url::Url::parse(input.trim()).is_ok_and(|parsed| {
        parsed.host_str() == Some(PLAYER_HOST) && parsed.path().starts_with("/video/")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_patterns_compile() {
        assert_eq!(COMPILED.len(), PATTERNS.len());
    }

    #[test]
    fn extracts_id_from_page_forms() {
        let cases = [
            ("https://vimeo.com/76979871", 76_979_871),
            ("http://vimeo.com/76979871", 76_979_871),
            ("vimeo.com/76979871", 76_979_871),
            ("//vimeo.com/76979871", 76_979_871),
            ("https://www.vimeo.com/76979871?share=copy", 76_979_871),
            ("https://vimeo.com/channels/staffpicks/76979871", 76_979_871),
            ("https://vimeo.com/groups/shortfilms/videos/76979871", 76_979_871),
            ("https://player.vimeo.com/video/76979871", 76_979_871),
            ("https://player.vimeo.com/video/76979871?h=8272103f6e", 76_979_871),
            ("https://vimeo.com/showcase/7008490/video/413286047", 413_286_047),
            ("76979871", 76_979_871),
        ];
        for (url, id) in cases {
            assert_eq!(
                extract_video_id(url).map(VideoId::get),
                Some(id),
                "failed for {url}"
            );
        }
    }

    #[test]
    fn rejects_foreign_and_empty_inputs() {
        for input in [
            "",
            "   ",
            "https://example.com/76979871",
            "https://notvimeo.com/76979871",
            "https://vimeo.com/",
            "https://vimeo.com/about",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
        ] {
            assert!(!is_recognized(input), "{input} should not match");
            assert!(extract_video_id(input).is_none());
        }
    }

    #[test]
    fn first_declared_pattern_wins() {
        // Both the page pattern and the showcase pattern accept this input
        let details = match_details("https://vimeo.com/76979871").unwrap();
        assert_eq!(details.pattern, 1);

        let details = match_details("123456").unwrap();
        assert_eq!(details.pattern, 0);
    }

    #[test]
    fn id_comes_from_last_participating_group() {
        let details = match_details("https://vimeo.com/groups/12/videos/76979871").unwrap();
        assert_eq!(details.groups[0].as_deref(), Some("12"));
        assert_eq!(details.last_group(), Some("76979871"));
        assert_eq!(details.video_id(), Some(VideoId::new(76_979_871)));
    }

    #[test]
    fn unparseable_id_is_absent_not_zero() {
        // Recognised, but the id overflows u64
        let input = "99999999999999999999999999";
        assert!(is_recognized(input));
        assert_eq!(extract_video_id(input), None);
    }

    #[test]
    fn player_url_is_canonical() {
        assert_eq!(
            VideoId::new(76_979_871).player_url(),
            "https://player.vimeo.com/video/76979871"
        );
        assert!(is_player_url("https://player.vimeo.com/video/1?h=x"));
        assert!(!is_player_url("https://vimeo.com/1"));
    }

    #[test]
    fn player_host_must_be_the_url_host() {
        assert!(!is_player_url("https://evil.example/?r=player.vimeo.com/video/1"));
        assert!(!is_player_url("https://evil.example/player.vimeo.com/video/1"));
        assert!(!is_player_url("https://player.vimeo.com.evil.example/video/1"));
        assert!(!is_player_url("player.vimeo.com/video/1"));
        assert!(is_player_url("http://player.vimeo.com/video/76979871"));
    }
}
