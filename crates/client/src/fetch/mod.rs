//! Bounded HTTP fetch pipeline.
//!
//! ### Bounds
//! - Fixed User-Agent, set once on the client
//! - Per-request timeout covering connect, headers, and body
//! - Hard byte ceiling: the body is streamed and cut off at `max_bytes`
//!   rather than rejected, with `truncated` set on the response
//!
//! ### Status handling
//! - Redirects follow the client's policy (default cap: 10)
//! - Any non-2xx final status is `FetchError::BadStatus`, which keeps the
//!   post-redirect URL
//!
//! ### Cancellation
//! Dropping the returned future aborts the in-flight request, so an inbound
//! request that goes away takes its outbound fetches with it.

pub mod error;
pub mod url;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode, Url, header};
use std::time::{Duration, Instant};

pub use error::FetchError;
pub use self::url::{UrlError, canonicalize};

use homeport_core::Error;

/// Accept header for HTML page fetches.
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Accept header for icon and image fetches.
pub const ACCEPT_IMAGE: &str = "image/avif,image/webp,image/apng,image/svg+xml,image/*,*/*;q=0.8";

/// Accept header for JSON provider APIs.
pub const ACCEPT_JSON: &str = "application/json";

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "homeport/0.1")
    pub user_agent: String,

    /// Maximum number of redirects to follow (default: 10)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "homeport/0.1".to_string(), max_redirects: 10 }
    }
}

/// Per-request bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Body bytes kept before truncating.
    pub max_bytes: usize,
    /// Total time allowed for the request.
    pub timeout: Duration,
}

impl FetchLimits {
    pub fn new(max_bytes: usize, timeout: Duration) -> Self {
        Self { max_bytes, timeout }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body, at most `max_bytes` long
    pub bytes: Bytes,
    /// Whether the body was cut off at `max_bytes`
    pub truncated: bool,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Mime type without parameters, lowercased.
    pub fn mime(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
            .filter(|m| !m.is_empty())
    }

    /// Reject bodies that cannot be used as a complete binary asset.
    pub fn require_complete(self, max_bytes: usize) -> Result<Self, FetchError> {
        if self.truncated {
            return Err(FetchError::TooLarge(max_bytes));
        }
        if self.bytes.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(self)
    }
}

/// A bounded GET.
///
/// Implemented by [`FetchClient`] for real traffic; resolvers only see this
/// trait so they can be driven without a network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` with the given Accept header under `limits`.
    async fn fetch(&self, url: &Url, accept: &str, limits: FetchLimits) -> Result<FetchResponse, FetchError>;
}

/// HTTP fetch client backed by reqwest.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: &FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::FetchFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, url: &Url, accept: &str, limits: FetchLimits) -> Result<FetchResponse, FetchError> {
        let start = Instant::now();

        let mut response = self
            .http
            .get(url.clone())
            .header(header::ACCEPT, accept)
            .timeout(limits.timeout)
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().clone();
        if !status.is_success() {
            return Err(FetchError::BadStatus { status: status.as_u16(), final_url });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let capacity = response
            .content_length()
            .map_or(8 * 1024, |len| (len as usize).min(limits.max_bytes));
        let mut body = BytesMut::with_capacity(capacity);
        let mut truncated = false;

        while let Some(chunk) = response.chunk().await? {
            let remaining = limits.max_bytes - body.len();
            if chunk.len() > remaining {
                body.extend_from_slice(&chunk[..remaining]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} in {}ms ({} bytes{})",
            url,
            final_url,
            fetch_ms,
            body.len(),
            if truncated { ", truncated" } else { "" }
        );

        Ok(FetchResponse {
            url: url.clone(),
            final_url,
            status,
            content_type,
            bytes: body.freeze(),
            truncated,
            fetch_ms,
        })
    }
}
