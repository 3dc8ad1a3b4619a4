//! Error taxonomy for the resolution pipeline.
//!
//! Every failure the pipeline can detect maps onto one of four kinds.
//! Under [`Containment::Suppress`](crate::containment::Containment) these
//! are recorded and turned into "no result"; under `Propagate` they reach
//! the caller unchanged.

use thiserror::Error;

/// Resolution pipeline errors
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// An argument was missing, empty, or of the wrong shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The transport returned a non-success status, an empty body, or faulted.
    #[error("fetch failed for {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    /// The page could not be decoded into a player configuration.
    #[error("parse failed: {0}")]
    ParseFailure(&'static str),

    /// The configuration decoded but carried no usable progressive URL.
    #[error("no progressive stream candidate for {0}")]
    NoStreamCandidate(String),
}

impl ScrapeError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::FetchFailure {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly name of the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "InvalidInput",
            Self::FetchFailure { .. } => "FetchFailure",
            Self::ParseFailure(_) => "ParseFailure",
            Self::NoStreamCandidate(_) => "NoStreamCandidate",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
