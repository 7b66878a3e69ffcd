//! Attachment source fetching
//!
//! The [`Fetcher`] trait is the seam between the download executor and the
//! network. [`HttpFetcher`] is the production implementation; tests substitute
//! in-memory fetchers to control timing.

use crate::config::DownloadConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;

/// Stream of body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// An opened source, ready to stream
pub struct FetchResponse {
    /// Declared body length, if the source announced one
    pub content_length: Option<u64>,
    /// Declared MIME type, if any
    pub mime_type: Option<String>,
    /// Body chunks
    pub stream: ByteStream,
}

/// Abstraction over attachment source retrieval
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Open `url` for streaming
    ///
    /// # Errors
    ///
    /// Connection failures, timeouts and non-success statuses are errors; the
    /// returned stream may still fail mid-transfer.
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}

/// HTTP(S) fetcher backed by reqwest
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    /// Bounds the wait for response headers, not the body
    header_timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the configured timeouts
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("alertbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            header_timeout: config.fetch_timeout,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let sent = tokio::time::timeout(self.header_timeout, self.client.get(url).send())
            .await
            .map_err(|_| {
                Error::Io(std::io::Error::other(format!("Timeout fetching '{}'", url)))
            })?;
        let response = sent.map_err(|e| {
            let error_msg = if e.is_timeout() {
                format!("Timeout fetching '{}'", url)
            } else if e.is_connect() {
                format!("Connection failed for URL '{}': {}", url, e)
            } else {
                format!("Failed to fetch '{}': {}", url, e)
            };
            Error::Io(std::io::Error::other(error_msg))
        })?;

        // Check HTTP status before streaming the body
        if !response.status().is_success() {
            return Err(Error::Io(std::io::Error::other(format!(
                "HTTP error fetching attachment: {} {}",
                response.status(),
                url
            ))));
        }

        let content_length = response.content_length();
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));

        Ok(FetchResponse {
            content_length,
            mime_type,
            stream: Box::pin(stream),
        })
    }
}
