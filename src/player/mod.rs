//! Player page handling: the config blob, its extraction and stream
//! selection.

pub mod config;
pub mod extract;
pub mod select;

pub use config::{PlayerConfig, PlayerFiles, PlayerRequest, ProgressiveFile, VideoMetadata, VideoOwner};
pub use extract::{
    extract_config, extract_config_with, render_page, ConfigScanner, MarkerScanner, CONFIG_MARKER,
};
pub use select::select_stream;
