//! HTTP transport used by the page fetcher and the stream opener.
//!
//! [`Transport`] is the seam between the pipeline and the network: the
//! pipeline only ever asks for a buffered response or a live byte stream.
//! [`HttpTransport`] is the `reqwest` implementation:
//! - TLS 1.3 via rustls
//! - Brotli, Zstd, Gzip, Deflate (auto-negotiated)
//! - Separate clients for secure and plain transports
//! - Per-request headers, query, user agent and timeout from [`FetchOptions`]

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info, instrument};

use crate::error::{Result, ScrapeError};
use crate::options::FetchOptions;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// Live media body. Owned by whoever holds it; never buffered here.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Request method supported by the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// Transport family, picked from the URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `https://`
    Secure,
    /// `http://`
    Plain,
}

impl Scheme {
    /// Scheme of an absolute URL; anything but http(s) is rejected.
    pub fn of(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| ScrapeError::invalid(format!("unparseable stream url {url}: {e}")))?;
        match parsed.scheme() {
            "https" => Ok(Self::Secure),
            "http" => Ok(Self::Plain),
            other => Err(ScrapeError::invalid(format!(
                "unsupported stream scheme {other}: {url}"
            ))),
        }
    }
}

/// Buffered response, as returned in full-response mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// An opened media request whose body has not been consumed.
pub struct OpenedStream {
    pub url: String,
    pub scheme: Scheme,
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    body: Option<ByteStream>,
}

impl OpenedStream {
    pub fn new(url: impl Into<String>, scheme: Scheme, status: u16, body: ByteStream) -> Self {
        Self {
            url: url.into(),
            scheme,
            status,
            content_type: None,
            content_length: None,
            body: Some(body),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    #[must_use]
    pub fn with_content_length(mut self, content_length: Option<u64>) -> Self {
        self.content_length = content_length;
        self
    }

    /// Take ownership of the body. Later calls return `None`.
    pub fn take_body(&mut self) -> Option<ByteStream> {
        self.body.take()
    }

    pub fn body_mut(&mut self) -> Option<&mut ByteStream> {
        self.body.as_mut()
    }

    #[must_use]
    pub fn is_taken(&self) -> bool {
        self.body.is_none()
    }
}

impl fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedStream")
            .field("url", &self.url)
            .field("scheme", &self.scheme)
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("taken", &self.is_taken())
            .finish()
    }
}

/// Network collaborator of the pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue one request and buffer the whole body as text.
    async fn request(
        &self,
        method: Method,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse>;

    /// Issue a GET and hand back the body as a live stream.
    async fn open(&self, url: &str, scheme: Scheme, options: &FetchOptions)
        -> Result<OpenedStream>;
}

/// `reqwest`-backed transport
pub struct HttpTransport {
    secure: Client,
    plain: Client,
}

impl HttpTransport {
    /// Create a transport with the default browser user agent
    pub fn new() -> Result<Self> {
        Ok(Self {
            secure: Self::build(Self::builder().https_only(true))?,
            plain: Self::build(Self::builder())?,
        })
    }

    /// Client setup failures are transport faults, not bad caller input.
    fn build(builder: reqwest::ClientBuilder) -> Result<Client> {
        builder
            .build()
            .map_err(|e| ScrapeError::fetch("", format!("http client setup: {e}")))
    }

    fn builder() -> reqwest::ClientBuilder {
        Client::builder()
            // TLS 1.3 via rustls
            .use_rustls_tls()
            // Compression, auto-negotiated via Accept-Encoding
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            .user_agent(DEFAULT_USER_AGENT)
            // Only the connect phase is bounded; whole-request timeouts come
            // from FetchOptions so long media bodies are not cut off
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
    }

    fn client_for(&self, scheme: Scheme) -> &Client {
        match scheme {
            Scheme::Secure => &self.secure,
            Scheme::Plain => &self.plain,
        }
    }

    fn prepare(client: &Client, method: Method, url: &str, options: &FetchOptions) -> RequestBuilder {
        let mut builder = match method {
            Method::Get => client.get(url),
            Method::Post => client.post(url),
        };
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(agent) = &options.user_agent {
            builder = builder.header(USER_AGENT, agent.as_str());
        }
        if let (Method::Post, Some(body)) = (method, &options.body) {
            builder = builder.body(body.clone());
        }
        builder
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, options), fields(url = %url))]
    async fn request(
        &self,
        method: Method,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse> {
        let scheme = Scheme::of(url)?;
        debug!(?method, ?scheme, "Requesting page");

        let mut builder = Self::prepare(self.client_for(scheme), method, url, options);
        if let Some(timeout) = options.timeout() {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| ScrapeError::fetch(url, e))?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        info!(status, version = ?response.version(), "Response received");

        let body = response.text().await.map_err(|e| ScrapeError::fetch(url, e))?;

        Ok(FetchResponse {
            url: final_url,
            status,
            headers,
            body,
        })
    }

    #[instrument(skip(self, options), fields(url = %url))]
    async fn open(
        &self,
        url: &str,
        scheme: Scheme,
        options: &FetchOptions,
    ) -> Result<OpenedStream> {
        debug!(?scheme, "Opening media stream");

        let response = Self::prepare(self.client_for(scheme), Method::Get, url, options)
            .send()
            .await
            .map_err(|e| ScrapeError::fetch(url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();

        info!(status, ?content_length, "Media stream opened");

        let source = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| ScrapeError::fetch(source.as_str(), e)));

        Ok(OpenedStream::new(url, scheme, status, Box::pin(body))
            .with_content_type(content_type)
            .with_content_length(content_length))
    }
}
