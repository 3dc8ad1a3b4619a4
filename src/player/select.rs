//! Progressive stream selection.
//!
//! First entry with a non-empty URL wins. No ranking by resolution,
//! bitrate or size: the page already lists renditions in the order the
//! player itself would try them.

use super::config::ProgressiveFile;

/// First usable progressive candidate, if any.
pub fn select_stream(progressive: &[ProgressiveFile]) -> Option<&ProgressiveFile> {
    progressive.iter().find(|file| file.url().is_some())
}
