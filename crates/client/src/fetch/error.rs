//! Fetch error types.

use url::Url;

/// Errors from a bounded fetch.
///
/// All of these are recoverable for the resolvers: they move on to the next
/// fallback instead of failing the request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Non-2xx response, with the URL that produced it after redirects.
    #[error("bad status: {status}")]
    BadStatus { status: u16, final_url: Url },

    /// Request or body read timed out.
    #[error("request timeout")]
    Timeout,

    /// Body was cut off at the byte ceiling and the caller needs all of it.
    #[error("body exceeds {0} bytes")]
    TooLarge(usize),

    /// Response had no body.
    #[error("empty body")]
    Empty,

    /// Response declared a content type the caller cannot use.
    #[error("unexpected content type: {0}")]
    UnexpectedContentType(String),

    /// Connection, TLS, or redirect failure.
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout } else { FetchError::Network(err.to_string()) }
    }
}

impl From<FetchError> for homeport_core::Error {
    fn from(err: FetchError) -> Self {
        homeport_core::Error::FetchFailed(err.to_string())
    }
}
