//! HTTP transport seams
//!
//! The fetcher and the stream validator never talk to `reqwest` directly;
//! they go through these traits so tests can substitute in-memory transports.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use reqwest::{redirect, Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::trace;

use crate::errors::{AppResult, TransportError};
use crate::utils::url::UrlUtils;

/// Maximum number of redirects followed for playlists and probes
pub const MAX_REDIRECTS: usize = 3;

/// Per-request options for playlist downloads
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Headers-only view of a probe response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Downloads playlist documents
#[async_trait]
pub trait PlaylistTransport: Send + Sync {
    async fn get_text(&self, url: &str, options: &RequestOptions)
        -> Result<String, TransportError>;
}

/// Lightweight stream existence checks
///
/// Non-2xx statuses are returned as responses, not errors; only network
/// failures and timeouts are errors.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Metadata-only request
    async fn head(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, TransportError>;

    /// Partial-content request for the first `bytes` bytes
    async fn get_range(
        &self,
        url: &str,
        bytes: u64,
        timeout: Duration,
    ) -> Result<ProbeResponse, TransportError>;
}

/// `reqwest`-backed implementation of both transports
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, connect_timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }

    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<Response, TransportError> {
        trace!("HTTP request to {}", UrlUtils::obfuscate_credentials(url));
        request.send().await.map_err(|e| map_reqwest_error(url, e))
    }
}

#[async_trait]
impl PlaylistTransport for HttpTransport {
    async fn get_text(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<String, TransportError> {
        let response = self
            .send(url, self.client.get(url).timeout(options.timeout))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: UrlUtils::obfuscate_credentials(url),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: UrlUtils::obfuscate_credentials(url),
                }
            } else {
                TransportError::Body {
                    url: UrlUtils::obfuscate_credentials(url),
                    message: e.to_string(),
                }
            }
        })
    }
}

#[async_trait]
impl ProbeTransport for HttpTransport {
    async fn head(&self, url: &str, timeout: Duration) -> Result<ProbeResponse, TransportError> {
        let response = self
            .send(url, self.client.head(url).timeout(timeout))
            .await?;
        Ok(probe_response(&response))
    }

    async fn get_range(
        &self,
        url: &str,
        bytes: u64,
        timeout: Duration,
    ) -> Result<ProbeResponse, TransportError> {
        let last_byte = bytes.saturating_sub(1);
        let request = self
            .client
            .get(url)
            .header(RANGE, format!("bytes=0-{last_byte}"))
            .timeout(timeout);
        // Only the headers are inspected; the body is dropped unread.
        let response = self.send(url, request).await?;
        Ok(probe_response(&response))
    }
}

fn probe_response(response: &Response) -> ProbeResponse {
    let headers = response.headers();

    // For partial content the full size is the part after the slash.
    let content_length = header_str(headers, CONTENT_RANGE)
        .and_then(|range| range.rsplit('/').next())
        .and_then(|total| total.parse::<u64>().ok())
        .or_else(|| header_str(headers, CONTENT_LENGTH).and_then(|len| len.parse::<u64>().ok()));

    ProbeResponse {
        status: response.status().as_u16(),
        content_type: header_str(headers, CONTENT_TYPE).map(|ct| ct.to_ascii_lowercase()),
        content_length,
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> TransportError {
    let url = UrlUtils::obfuscate_credentials(url);
    if error.is_timeout() {
        TransportError::Timeout { url }
    } else if error.is_builder() {
        TransportError::Request {
            url,
            message: error.to_string(),
        }
    } else {
        TransportError::Connect {
            url,
            message: error.to_string(),
        }
    }
}
