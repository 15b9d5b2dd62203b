//! In-memory [`Fetcher`] for tests.
//!
//! Routes are keyed by exact URL string. Unknown URLs answer 404. Every call
//! is recorded so tests can assert how many remote fetches happened.

use crate::fetch::{FetchError, FetchLimits, FetchResponse, Fetcher};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// 1x1 transparent PNG, base64-encoded.
pub const PNG_1X1_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[derive(Debug, Clone)]
enum Reply {
    Body { final_url: Option<String>, content_type: Option<String>, body: Vec<u8> },
    Status { final_url: Option<String>, code: u16 },
    Timeout,
}

/// Call-counting stub fetcher.
#[derive(Debug, Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&self, url: &str, reply: Reply) {
        self.routes.lock().unwrap().insert(url.to_string(), reply);
    }

    /// Serve `body` as `text/html` at `url`.
    pub fn html(&self, url: &str, body: &str) {
        self.route(
            url,
            Reply::Body { final_url: None, content_type: Some("text/html; charset=utf-8".into()), body: body.into() },
        );
    }

    /// Serve `body` as HTML at `url` after redirecting to `final_url`.
    pub fn redirect_html(&self, url: &str, final_url: &str, body: &str) {
        self.route(
            url,
            Reply::Body {
                final_url: Some(final_url.to_string()),
                content_type: Some("text/html".into()),
                body: body.into(),
            },
        );
    }

    /// Serve `body` as `content_type` at `url` after redirecting to `final_url`.
    pub fn redirect_bytes(&self, url: &str, final_url: &str, content_type: &str, body: &[u8]) {
        self.route(
            url,
            Reply::Body {
                final_url: Some(final_url.to_string()),
                content_type: Some(content_type.to_string()),
                body: body.to_vec(),
            },
        );
    }

    /// Serve raw bytes with an optional content type.
    pub fn bytes(&self, url: &str, content_type: Option<&str>, body: &[u8]) {
        self.route(url, Reply::Body { final_url: None, content_type: content_type.map(String::from), body: body.to_vec() });
    }

    /// Answer `url` with a non-2xx status.
    pub fn status(&self, url: &str, code: u16) {
        self.route(url, Reply::Status { final_url: None, code });
    }

    /// Answer `url` with a non-2xx status after redirecting to `final_url`.
    pub fn redirect_status(&self, url: &str, final_url: &str, code: u16) {
        self.route(url, Reply::Status { final_url: Some(final_url.to_string()), code });
    }

    /// Make `url` time out.
    pub fn timeout(&self, url: &str) {
        self.route(url, Reply::Timeout);
    }

    /// Total number of fetches.
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Number of fetches of one URL.
    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    /// Every URL fetched, in order.
    pub fn requested(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, url: &Url, _accept: &str, limits: FetchLimits) -> Result<FetchResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self.routes.lock().unwrap().get(url.as_str()).cloned();

        match reply {
            None => Err(FetchError::BadStatus { status: 404, final_url: url.clone() }),
            Some(Reply::Status { final_url, code }) => {
                Err(FetchError::BadStatus { status: code, final_url: landed(url, final_url.as_deref())? })
            }
            Some(Reply::Timeout) => Err(FetchError::Timeout),
            Some(Reply::Body { final_url, content_type, mut body }) => {
                let truncated = body.len() > limits.max_bytes;
                body.truncate(limits.max_bytes);
                Ok(FetchResponse {
                    url: url.clone(),
                    final_url: landed(url, final_url.as_deref())?,
                    status: StatusCode::OK,
                    content_type,
                    bytes: Bytes::from(body),
                    truncated,
                    fetch_ms: 0,
                })
            }
        }
    }
}

fn landed(url: &Url, final_url: Option<&str>) -> Result<Url, FetchError> {
    match final_url {
        Some(f) => Url::parse(f).map_err(|e| FetchError::Network(e.to_string())),
        None => Ok(url.clone()),
    }
}

/// Decoded bytes of [`PNG_1X1_BASE64`].
pub fn png_1x1() -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(PNG_1X1_BASE64)
        .unwrap()
}
