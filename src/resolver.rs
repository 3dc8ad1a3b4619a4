//! Resolution orchestrator.
//!
//! Drives classifier → fetcher → extractor → selector and opens the media
//! stream. Opening follows three states:
//!
//! - **Direct**: the URL already points at media (known extension, or an
//!   http(s) URL that is not a Vimeo page). Go straight to Open.
//! - **Indirect**: the URL is a Vimeo reference. Fetch the canonical player
//!   page for its id, extract, select, then Open the selected URL.
//! - **Open**: pick the transport by scheme, issue the request and attach
//!   the live stream to the track.
//!
//! Failures inside the pipeline are plain errors. The call's
//! [`Containment`] is applied once, in [`Scraper::resolve`] and
//! [`Scraper::open_stream`].

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::classifier;
use crate::containment::Containment;
use crate::diagnostics::DiagnosticLog;
use crate::error::{Result, ScrapeError};
use crate::fetch::fetch_body;
use crate::http_client::{HttpTransport, OpenedStream, Scheme, Transport};
use crate::options::{FetchOptions, ScrapeOptions, ScrapeOverrides, ScraperConfig};
use crate::player::{extract_config, select_stream, PlayerConfig, ProgressiveFile};
use crate::track::ResolvedTrack;

/// File extensions treated as directly playable media.
const MEDIA_EXTENSIONS: &[&str] = &["mp4", "m4v", "m4a", "mp3", "mov", "webm"];

/// Whether `url` can be opened without going through a player page.
#[must_use]
pub fn is_direct_media_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }

    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_ascii_lowercase(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_ascii_lowercase(),
    };
    let has_media_extension = path
        .rsplit_once('.')
        .is_some_and(|(_, ext)| MEDIA_EXTENSIONS.contains(&ext));

    has_media_extension || (Scheme::of(url).is_ok() && !classifier::is_recognized(url))
}

/// Player page to fetch for a Vimeo reference.
///
/// Absolute player URLs are kept as given so their query (the `h=` hash of
/// unlisted videos) survives; every other form maps to the canonical page.
#[must_use]
pub fn player_page_url(input: &str) -> Option<String> {
    let input = input.trim();
    let id = classifier::extract_video_id(input)?;
    if classifier::is_player_url(input) && Scheme::of(input).is_ok() {
        Some(input.to_string())
    } else {
        Some(id.player_url())
    }
}

/// Vimeo resolver bound to a transport and a set of defaults.
pub struct Scraper<T: Transport = HttpTransport> {
    transport: T,
    defaults: ScrapeOptions,
    log: Option<DiagnosticLog>,
}

impl Scraper<HttpTransport> {
    /// Resolver with built-in defaults and the default diagnostic log.
    pub fn new() -> Result<Self> {
        Self::from_config(&ScraperConfig::default())
    }

    /// Resolver configured from a loaded [`ScraperConfig`].
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?, config))
    }
}

impl<T: Transport> Scraper<T> {
    /// Resolver over any [`Transport`].
    pub fn with_transport(transport: T, config: &ScraperConfig) -> Self {
        Self {
            transport,
            defaults: config.defaults.clone(),
            log: DiagnosticLog::from_config(&config.diagnostics),
        }
    }

    /// Replace the diagnostic log; `None` disables it.
    #[must_use]
    pub fn with_diagnostic_log(mut self, log: Option<DiagnosticLog>) -> Self {
        self.log = log;
        self
    }

    /// Defaults every call is merged over.
    #[must_use]
    pub fn defaults(&self) -> &ScrapeOptions {
        &self.defaults
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn diagnostic_log(&self) -> Option<&DiagnosticLog> {
        self.log.as_ref()
    }

    /// Resolve a page URL, bare id or direct media URL into a track.
    ///
    /// `extra` is caller metadata; its keys win over the parsed video
    /// metadata. With `auto_open_stream` set the media stream is opened
    /// before returning. Under [`Containment::Suppress`] any failure is
    /// recorded and reported as `Ok(None)`.
    #[instrument(skip(self, overrides, extra), fields(input = %input))]
    pub async fn resolve(
        &self,
        input: &str,
        overrides: &ScrapeOverrides,
        extra: Map<String, Value>,
    ) -> Result<Option<ResolvedTrack>> {
        let options = self.defaults.merged(overrides);
        let containment = options.containment;
        let outcome = self.resolve_inner(input, options, extra).await;
        containment.contain("resolve", self.log.as_ref(), outcome)
    }

    /// Open the media stream of `track` and attach it.
    ///
    /// Without `url` the track's stream URL is used, falling back to its
    /// page URL. Returns `Ok(None)` when the URL holds no usable video id.
    /// A track opens at most once: asking again returns the attached
    /// stream, asking again with an explicit URL is an error.
    pub async fn open_stream<'t>(
        &self,
        track: &'t mut ResolvedTrack,
        url: Option<&str>,
    ) -> Result<Option<&'t mut OpenedStream>> {
        let containment = track.options().containment;
        let outcome = self.open_inner(track, url).await;
        containment.contain("open stream", self.log.as_ref(), outcome)
    }

    async fn resolve_inner(
        &self,
        input: &str,
        options: ScrapeOptions,
        extra: Map<String, Value>,
    ) -> Result<Option<ResolvedTrack>> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ScrapeError::invalid("empty input"));
        }

        let mut track = if is_direct_media_url(input) {
            debug!("Direct media URL, skipping player page");
            ResolvedTrack::direct(input, extra, options)
        } else {
            let page_url = player_page_url(input)
                .ok_or_else(|| ScrapeError::invalid(format!("not a Vimeo reference: {input}")))?;
            let (page, config) = self.load_player(&page_url, &options.fetch).await?;
            ResolvedTrack::from_page(page, config, extra, options)
        };

        info!(
            stream = track.stream.url(),
            title = track.title().unwrap_or_default(),
            "Track resolved"
        );

        if track.options().auto_open_stream {
            self.open_inner(&mut track, None).await?;
        }
        Ok(Some(track))
    }

    async fn open_inner<'t>(
        &self,
        track: &'t mut ResolvedTrack,
        url: Option<&str>,
    ) -> Result<Option<&'t mut OpenedStream>> {
        if track.stream.is_open() {
            if url.is_some() {
                return Err(ScrapeError::invalid("stream already attached"));
            }
            return Ok(track.stream.handle_mut());
        }

        let source = match url {
            Some(url) => url.trim().to_string(),
            None => track
                .default_stream_source()
                .ok_or_else(|| ScrapeError::invalid("track has no stream url"))?,
        };
        let fetch_options = track.options().fetch.clone();

        let stream_url = if is_direct_media_url(&source) {
            debug!(url = %source, "Opening direct");
            source
        } else {
            let Some(id) = classifier::extract_video_id(&source) else {
                debug!(url = %source, "No video id, nothing to open");
                return Ok(None);
            };
            let page_url = id.player_url();
            let (_, config) = self.load_player(&page_url, &fetch_options).await?;
            let candidate = select_stream(config.progressive())
                .ok_or_else(|| ScrapeError::NoStreamCandidate(page_url.clone()))?;
            track.stream.adopt(candidate);
            candidate.url().unwrap_or_default().to_string()
        };

        if stream_url.trim().is_empty() {
            return Err(ScrapeError::invalid("empty stream url"));
        }
        let scheme = Scheme::of(&stream_url)?;
        let opened = self.transport.open(&stream_url, scheme, &fetch_options).await?;
        if !(200..300).contains(&opened.status) {
            warn!(url = %stream_url, status = opened.status, "Media request rejected");
            return Err(ScrapeError::fetch(
                stream_url,
                format!("status {}", opened.status),
            ));
        }

        track.stream.adopt(&ProgressiveFile::from_url(stream_url.as_str()));
        track.stream.attach(opened);
        Ok(track.stream.handle_mut())
    }

    /// Fetch and decode one player page. Errors always propagate here;
    /// the public entry points decide what to do with them.
    async fn load_player(
        &self,
        page_url: &str,
        options: &FetchOptions,
    ) -> Result<(String, PlayerConfig)> {
        let page = fetch_body(&self.transport, page_url, options, Containment::Propagate, None)
            .await?
            .ok_or_else(|| ScrapeError::fetch(page_url, "empty body"))?;
        let config = extract_config(&page)?;
        Ok((page, config))
    }
}

/// Resolve `input` with the configuration found on disk.
///
/// A configuration file that cannot be read is reported and replaced by
/// the built-in defaults.
pub async fn resolve(input: &str) -> Result<Option<ResolvedTrack>> {
    let config = ScraperConfig::load().unwrap_or_else(|e| {
        warn!("Using default configuration: {:#}", e);
        ScraperConfig::default()
    });
    Scraper::from_config(&config)?
        .resolve(input, &ScrapeOverrides::default(), Map::new())
        .await
}
