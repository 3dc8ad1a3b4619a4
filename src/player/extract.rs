//! Player page → [`PlayerConfig`].
//!
//! The player page assigns its configuration in an inline script:
//!
//! ```text
//! <script> (function(document, player) { var config = {...}; if (!config.request) ...
//! ```
//!
//! [`MarkerScanner`] finds that literal marker and cuts the JSON at the
//! first `;`. This is a textual heuristic, not an HTML parser. The marker
//! is an unwritten contract with the upstream page template and will
//! break if the template changes; a `;` inside a JSON string also cuts
//! the literal short. Swap in another [`ConfigScanner`] to change the
//! strategy without touching the rest of the pipeline.

use tracing::debug;

use super::config::PlayerConfig;
use crate::error::{Result, ScrapeError};

/// Text that precedes the config object in the player page.
pub const CONFIG_MARKER: &str = "<script> (function(document, player) { var config = ";

/// Ends the config assignment statement.
pub const CONFIG_TERMINATOR: char = ';';

const INVALID_BODY: &str = "invalid response body";
const INVALID_PAYLOAD: &str = "invalid structured payload";

/// Finds the JSON literal of the config inside a page.
pub trait ConfigScanner: Send + Sync {
    /// Slice of `page` holding the config literal, if any.
    fn locate<'a>(&self, page: &'a str) -> Option<&'a str>;
}

/// Marker-and-terminator scanner used for the current page template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerScanner {
    marker: String,
    terminator: char,
}

impl MarkerScanner {
    pub fn new(marker: impl Into<String>, terminator: char) -> Self {
        Self {
            marker: marker.into(),
            terminator,
        }
    }
}

impl Default for MarkerScanner {
    fn default() -> Self {
        Self::new(CONFIG_MARKER, CONFIG_TERMINATOR)
    }
}

impl ConfigScanner for MarkerScanner {
    fn locate<'a>(&self, page: &'a str) -> Option<&'a str> {
        if self.marker.is_empty() {
            return None;
        }
        let (_, after) = page.split_once(self.marker.as_str())?;
        // Text up to a second marker, then up to the terminator
        let segment = after.split(self.marker.as_str()).next().unwrap_or(after);
        segment.split(self.terminator).next()
    }
}

/// Decode the player config embedded in `page`.
pub fn extract_config(page: &str) -> Result<PlayerConfig> {
    extract_config_with(&MarkerScanner::default(), page)
}

/// [`extract_config`] with a custom scanner.
pub fn extract_config_with<S: ConfigScanner + ?Sized>(scanner: &S, page: &str) -> Result<PlayerConfig> {
    if page.trim().is_empty() {
        return Err(ScrapeError::ParseFailure(INVALID_BODY));
    }

    let Some(literal) = scanner.locate(page) else {
        debug!("Config marker not found in {} byte page", page.len());
        return Err(ScrapeError::ParseFailure(INVALID_PAYLOAD));
    };

    serde_json::from_str(literal.trim()).map_err(|e| {
        debug!("Player config rejected: {}", e);
        ScrapeError::ParseFailure(INVALID_PAYLOAD)
    })
}

/// Build a minimal player page around `config`.
///
/// Inverse of [`extract_config`] for configs whose JSON contains no
/// terminator character.
pub fn render_page(config: &PlayerConfig) -> Result<String> {
    let json = serde_json::to_string(config).map_err(|e| {
        debug!("Player config not serialisable: {}", e);
        ScrapeError::ParseFailure(INVALID_PAYLOAD)
    })?;

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>player</title></head>\n<body>\n\
         <div class=\"vp-player\"></div>\n\
         {CONFIG_MARKER}{json}{CONFIG_TERMINATOR} if (!config.request) {{ return; }} \
         player.load(config); }}(document, document.querySelector('.vp-player')));</script>\n\
         </body>\n</html>\n"
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_config() -> PlayerConfig {
        serde_json::from_value(json!({
            "video": {
                "id": 76979871,
                "title": "The New Vimeo Player (You Know, For Videos)",
                "url": "https://vimeo.com/76979871",
                "duration": 62,
                "width": 1280,
                "height": 720,
                "owner": {"id": 1, "name": "Vimeo Staff", "url": "https://vimeo.com/staff"}
            },
            "request": {
                "files": {
                    "progressive": [
                        {"url": "https://cdn.example.com/720.mp4", "quality": "720p", "width": 1280, "height": 720},
                        {"url": "https://cdn.example.com/360.mp4", "quality": "360p", "width": 640, "height": 360}
                    ]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn empty_page_is_invalid_body() {
        let err = extract_config("").unwrap_err();
        assert!(matches!(err, ScrapeError::ParseFailure(INVALID_BODY)));
        let err = extract_config("  \n ").unwrap_err();
        assert!(matches!(err, ScrapeError::ParseFailure(INVALID_BODY)));
    }

    #[test]
    fn missing_marker_and_bad_json_fail_identically() {
        let no_marker = extract_config("<html><script>var config = {};</script></html>").unwrap_err();
        let bad_json = extract_config(&format!("<html>{CONFIG_MARKER}{{\"video\": }};</html>")).unwrap_err();

        assert!(matches!(no_marker, ScrapeError::ParseFailure(INVALID_PAYLOAD)));
        assert!(matches!(bad_json, ScrapeError::ParseFailure(INVALID_PAYLOAD)));
        assert_eq!(no_marker.to_string(), bad_json.to_string());
    }

    #[test]
    fn missing_required_keys_is_invalid_payload() {
        let page = format!("{CONFIG_MARKER}{{\"video\": {{}}, \"request\": {{}}}};");
        assert!(matches!(
            extract_config(&page),
            Err(ScrapeError::ParseFailure(INVALID_PAYLOAD))
        ));

        let page = format!("{CONFIG_MARKER}{{\"request\": {{\"files\": {{\"progressive\": []}}}}}};");
        assert!(matches!(
            extract_config(&page),
            Err(ScrapeError::ParseFailure(INVALID_PAYLOAD))
        ));
    }

    #[test]
    fn round_trips_through_rendered_page() {
        let config = sample_config();
        let page = render_page(&config).unwrap();
        assert_eq!(extract_config(&page).unwrap(), config);
    }

    #[test]
    fn truncates_at_first_terminator() {
        let scanner = MarkerScanner::default();
        let page = format!("junk{CONFIG_MARKER}{{\"a\":1}}; var x = 2;");
        assert_eq!(scanner.locate(&page), Some("{\"a\":1}"));
    }

    #[test]
    fn semicolon_inside_json_breaks_the_heuristic() {
        let mut config = sample_config();
        config.video.title = Some("part one; part two".to_string());
        let page = render_page(&config).unwrap();
        assert!(extract_config(&page).is_err());
    }

    #[test]
    fn custom_scanner_replaces_the_marker() {
        let scanner = MarkerScanner::new("window.playerConfig = ", ';');
        let json = serde_json::to_string(&sample_config()).unwrap();
        let page = format!("<script>window.playerConfig = {json};</script>");

        assert!(extract_config(&page).is_err());
        assert_eq!(extract_config_with(&scanner, &page).unwrap(), sample_config());
    }

    #[test]
    fn empty_marker_never_matches() {
        assert_eq!(MarkerScanner::new("", ';').locate("{}"), None);
    }
}
