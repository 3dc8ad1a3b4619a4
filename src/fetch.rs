//! Page fetcher: a thin adapter over [`Transport`].
//!
//! One request, no retries. Anything other than a 200 with a non-empty
//! body is a [`ScrapeError::FetchFailure`]; whether that surfaces as an
//! error or as `Ok(None)` is decided by the [`Containment`] the caller
//! passes in.

use tracing::debug;

use crate::containment::Containment;
use crate::diagnostics::DiagnosticLog;
use crate::error::{Result, ScrapeError};
use crate::http_client::{FetchResponse, Method, Transport};
use crate::options::FetchOptions;

/// Which part of the response the caller wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnKind {
    /// Just the body text.
    #[default]
    Body,
    /// Status, headers, final URL and body.
    Full,
}

/// Result of [`fetch`], shaped by the requested [`ReturnKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Body(String),
    Full(FetchResponse),
}

impl Fetched {
    #[must_use]
    pub fn into_body(self) -> String {
        match self {
            Self::Body(body) => body,
            Self::Full(response) => response.body,
        }
    }
}

/// Fetch `url` once and validate the response.
///
/// An empty `url` returns `Ok(None)` without touching the network.
pub async fn fetch<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    options: &FetchOptions,
    kind: ReturnKind,
    containment: Containment,
    method: Method,
    log: Option<&DiagnosticLog>,
) -> Result<Option<Fetched>> {
    if url.trim().is_empty() {
        return Ok(None);
    }

    let outcome = request_checked(transport, url, options, method)
        .await
        .map(|response| {
            Some(match kind {
                ReturnKind::Body => Fetched::Body(response.body),
                ReturnKind::Full => Fetched::Full(response),
            })
        });

    containment.contain("page fetch", log, outcome)
}

/// GET `url` and return the body text.
pub async fn fetch_body<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    options: &FetchOptions,
    containment: Containment,
    log: Option<&DiagnosticLog>,
) -> Result<Option<String>> {
    let fetched = fetch(
        transport,
        url,
        options,
        ReturnKind::Body,
        containment,
        Method::Get,
        log,
    )
    .await?;
    Ok(fetched.map(Fetched::into_body))
}

async fn request_checked<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    options: &FetchOptions,
    method: Method,
) -> Result<FetchResponse> {
    let response = transport.request(method, url, options).await?;
    debug!(url, status = response.status, bytes = response.body.len(), "Page fetched");

    if response.status != 200 {
        return Err(ScrapeError::fetch(url, format!("status {}", response.status)));
    }
    if response.body.trim().is_empty() {
        return Err(ScrapeError::fetch(url, "empty body"));
    }
    Ok(response)
}
