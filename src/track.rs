//! The resolved track handed back to callers.
//!
//! Metadata precedence is explicit: caller-supplied extra fields override
//! the parsed `video` object, which overrides nothing. See [`merge_fields`].

use serde_json::{Map, Value};

use crate::classifier::{self, VideoId};
use crate::error::Result;
use crate::http_client::{ByteStream, OpenedStream};
use crate::options::ScrapeOptions;
use crate::player::{extract_config, select_stream, PlayerConfig, ProgressiveFile, VideoMetadata};

/// Merge metadata maps, `extra` winning over `parsed`.
pub fn merge_fields(extra: &Map<String, Value>, parsed: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = parsed.clone();
    for (key, value) in extra {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Chosen progressive candidate plus, once opened, the live stream.
#[derive(Debug, Default)]
pub struct TrackStream {
    /// Candidate metadata (quality, size, ...).
    pub file: ProgressiveFile,
    handle: Option<OpenedStream>,
}

impl TrackStream {
    fn new(file: ProgressiveFile) -> Self {
        Self { file, handle: None }
    }

    /// Stream URL; empty when no candidate was found.
    #[must_use]
    pub fn url(&self) -> &str {
        self.file.url().unwrap_or("")
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    #[must_use]
    pub fn handle(&self) -> Option<&OpenedStream> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut OpenedStream> {
        self.handle.as_mut()
    }

    /// Take the opened byte stream. Later calls return `None`.
    pub fn take_body(&mut self) -> Option<ByteStream> {
        self.handle.as_mut()?.take_body()
    }

    /// Adopt `candidate` if no usable candidate is known yet. Existing
    /// metadata is kept as is.
    pub(crate) fn adopt(&mut self, candidate: &ProgressiveFile) {
        if self.file.url().is_none() {
            self.file = candidate.clone();
        }
    }

    pub(crate) fn attach(&mut self, opened: OpenedStream) {
        self.handle = Some(opened);
    }
}

/// Result of resolving a Vimeo reference.
#[derive(Debug)]
pub struct ResolvedTrack {
    raw: Option<String>,
    extra_raw: Map<String, Value>,
    video: VideoMetadata,
    fields: Map<String, Value>,
    options: ScrapeOptions,
    pub stream: TrackStream,
}

impl ResolvedTrack {
    /// Track built from a fetched player page.
    pub fn from_page(
        raw: String,
        config: PlayerConfig,
        extra: Map<String, Value>,
        options: ScrapeOptions,
    ) -> Self {
        let file = select_stream(config.progressive()).cloned().unwrap_or_default();
        let parsed = match serde_json::to_value(&config.video) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Self {
            raw: Some(raw),
            fields: merge_fields(&extra, &parsed),
            extra_raw: extra,
            video: config.video,
            options,
            stream: TrackStream::new(file),
        }
    }

    /// Track for an already-direct media URL; no page involved.
    pub fn direct(url: impl Into<String>, extra: Map<String, Value>, options: ScrapeOptions) -> Self {
        Self {
            raw: None,
            fields: merge_fields(&extra, &Map::new()),
            extra_raw: extra,
            video: VideoMetadata::default(),
            options,
            stream: TrackStream::new(ProgressiveFile::from_url(url)),
        }
    }

    /// Player page text, if one was fetched.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Caller-supplied extra metadata, unmodified.
    #[must_use]
    pub fn extra_raw(&self) -> &Map<String, Value> {
        &self.extra_raw
    }

    /// Parsed `video` object of the player config.
    #[must_use]
    pub fn video(&self) -> &VideoMetadata {
        &self.video
    }

    /// Merged metadata view.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.field("title").and_then(Value::as_str)
    }

    /// Page URL of the video.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.field("url").and_then(Value::as_str)
    }

    /// Video id, re-parsed from [`url`](Self::url) on every call.
    #[must_use]
    pub fn video_id(&self) -> Option<VideoId> {
        classifier::extract_video_id(self.url()?)
    }

    /// Options this track was resolved with.
    #[must_use]
    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    /// A track is usable only with a non-empty stream URL.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.stream.url().is_empty()
    }

    /// Decode the kept page text again.
    pub fn reparse(&self) -> Result<PlayerConfig> {
        extract_config(self.raw.as_deref().unwrap_or_default())
    }

    /// Where `open_stream` starts when no URL is given: the stream URL,
    /// else the page URL.
    pub(crate) fn default_stream_source(&self) -> Option<String> {
        self.stream
            .file
            .url()
            .or_else(|| self.url())
            .map(str::to_string)
    }

    /// Flat JSON view: merged fields plus the `stream` candidate.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        if let Ok(stream) = serde_json::to_value(&self.stream.file) {
            map.insert("stream".to_string(), stream);
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn config(progressive: Value) -> PlayerConfig {
        serde_json::from_value(json!({
            "video": {"id": 76979871, "title": "Parsed title", "url": "https://vimeo.com/76979871", "duration": 62},
            "request": {"files": {"progressive": progressive}}
        }))
        .unwrap()
    }

    #[test]
    fn extra_overrides_parsed() {
        let extra = object(json!({"title": "Caller title", "playlist": "p1"}));
        let parsed = object(json!({"title": "Parsed title", "duration": 62}));
        let merged = merge_fields(&extra, &parsed);
        assert_eq!(merged["title"], "Caller title");
        assert_eq!(merged["duration"], 62);
        assert_eq!(merged["playlist"], "p1");
    }

    #[test]
    fn page_track_exposes_merged_metadata() {
        let extra = object(json!({"title": "Caller title"}));
        let track = ResolvedTrack::from_page(
            "<html>".to_string(),
            config(json!([{"url": ""}, {"url": "https://cdn.example.com/a.mp4", "quality": "540p"}])),
            extra.clone(),
            ScrapeOptions::default(),
        );

        assert_eq!(track.raw(), Some("<html>"));
        assert_eq!(track.extra_raw(), &extra);
        assert_eq!(track.title(), Some("Caller title"));
        assert_eq!(track.video().title.as_deref(), Some("Parsed title"));
        assert_eq!(track.field("duration"), Some(&json!(62)));
        assert_eq!(track.stream.url(), "https://cdn.example.com/a.mp4");
        assert_eq!(track.stream.file.quality.as_deref(), Some("540p"));
        assert!(track.is_valid());
        assert!(!track.stream.is_open());
    }

    #[test]
    fn mistyped_video_fields_reach_the_track() {
        let config: PlayerConfig = serde_json::from_value(json!({
            "video": {"id": 1, "title": null, "duration": 62.5, "width": "1280", "privacy": "anybody"},
            "request": {"files": {"progressive": []}}
        }))
        .unwrap();
        let track = ResolvedTrack::from_page("<html>".to_string(), config, Map::new(), ScrapeOptions::default());

        assert_eq!(track.field("id"), Some(&json!(1)));
        assert_eq!(track.field("title"), Some(&Value::Null));
        assert_eq!(track.field("duration"), Some(&json!(62.5)));
        assert_eq!(track.field("width"), Some(&json!("1280")));
        assert_eq!(track.field("privacy"), Some(&json!("anybody")));
        assert_eq!(track.title(), None);
    }

    #[test]
    fn video_id_follows_the_url_field() {
        let track = ResolvedTrack::from_page(
            "<html>".to_string(),
            config(json!([])),
            Map::new(),
            ScrapeOptions::default(),
        );
        assert_eq!(track.video_id(), Some(VideoId::new(76_979_871)));

        let extra = object(json!({"url": "https://vimeo.com/channels/staffpicks/123456"}));
        let track = ResolvedTrack::from_page(
            "<html>".to_string(),
            config(json!([])),
            extra,
            ScrapeOptions::default(),
        );
        assert_eq!(track.video_id(), Some(VideoId::new(123_456)));
    }

    #[test]
    fn track_without_candidate_is_invalid() {
        let track = ResolvedTrack::from_page(
            "<html>".to_string(),
            config(json!([{"url": ""}])),
            Map::new(),
            ScrapeOptions::default(),
        );
        assert!(!track.is_valid());
        assert_eq!(track.stream.url(), "");
        assert_eq!(
            track.default_stream_source().as_deref(),
            Some("https://vimeo.com/76979871")
        );
    }

    #[test]
    fn direct_track_has_no_page() {
        let track = ResolvedTrack::direct(
            "https://cdn.example.com/file.mp4",
            Map::new(),
            ScrapeOptions::default(),
        );
        assert!(track.raw().is_none());
        assert!(track.video_id().is_none());
        assert!(track.is_valid());
        assert!(track.reparse().is_err());
    }

    #[test]
    fn adopt_keeps_existing_candidate() {
        let mut stream = TrackStream::new(ProgressiveFile::from_url("https://cdn.example.com/a.mp4"));
        stream.adopt(&ProgressiveFile::from_url("https://cdn.example.com/b.mp4"));
        assert_eq!(stream.url(), "https://cdn.example.com/a.mp4");

        let mut stream = TrackStream::default();
        stream.adopt(&ProgressiveFile::from_url("https://cdn.example.com/b.mp4"));
        assert_eq!(stream.url(), "https://cdn.example.com/b.mp4");
    }

    #[test]
    fn flat_value_carries_stream() {
        let track = ResolvedTrack::direct(
            "https://cdn.example.com/file.mp4",
            object(json!({"title": "Mine"})),
            ScrapeOptions::default(),
        );
        let value = track.to_value();
        assert_eq!(value["title"], "Mine");
        assert_eq!(value["stream"]["url"], "https://cdn.example.com/file.mp4");
    }
}
