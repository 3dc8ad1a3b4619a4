//! `vimeo-scraper` - Vimeo URL to progressive media stream
//!
//! # Features
//!
//! - **URL classification**: page, channel, group, showcase, player and bare-id forms
//! - **Player page extraction**: embedded config decoded into typed metadata
//! - **Stream selection**: first usable progressive rendition
//! - **Error containment**: propagate, or suppress and record to a size-capped log
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use vimeo_scraper::Scraper;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let scraper = Scraper::new()?;
//!     let overrides = Default::default();
//!     if let Some(mut track) = scraper.resolve("https://vimeo.com/76979871", &overrides, Default::default()).await? {
//!         println!("{:?} -> {}", track.title(), track.stream.url());
//!         if let Some(mut body) = track.stream.take_body() {
//!             let first = body.next().await.transpose()?;
//!             println!("First chunk: {:?} bytes", first.map(|b| b.len()));
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod classifier;
pub mod containment;
pub mod diagnostics;
pub mod error;
pub mod fetch;
pub mod http_client;
pub mod options;
pub mod player;
pub mod resolver;
pub mod track;

pub use classifier::{extract_video_id, is_recognized, match_details, UrlMatch, VideoId};
pub use containment::Containment;
pub use diagnostics::DiagnosticLog;
pub use error::{Result, ScrapeError};
pub use fetch::{fetch, fetch_body, Fetched, ReturnKind};
pub use http_client::{ByteStream, FetchResponse, HttpTransport, Method, OpenedStream, Scheme, Transport};
pub use options::{DiagnosticsConfig, FetchOptions, ScrapeOptions, ScrapeOverrides, ScraperConfig};
pub use player::{extract_config, render_page, select_stream, ConfigScanner, MarkerScanner, PlayerConfig, ProgressiveFile};
pub use resolver::{is_direct_media_url, resolve, Scraper};
pub use track::{merge_fields, ResolvedTrack, TrackStream};

/// Version of vimeo-scraper
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
