//! Unified error types for homeport.
//!
//! Every variant renders with a stable, upper-case code prefix so that log
//! lines and API error bodies can be matched without parsing prose.

use tokio_rusqlite::rusqlite;

/// Unified error types for the homeport asset cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a URL without a host).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A remote fetch failed (bad status, timeout, oversized or empty body).
    #[error("FETCH_FAILED: {0}")]
    FetchFailed(String),

    /// A data URI or provider payload could not be decoded.
    #[error("DECODE_FAILED: {0}")]
    DecodeFailed(String),

    /// Writing an asset to disk failed.
    #[error("WRITE_FAILED: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Nothing usable could be resolved for the request.
    #[error("RESOLVE_FAILED: {0}")]
    ResolveFailed(String),

    /// A background provider could not produce an image.
    #[error("PROVIDER_FAILED: {0}")]
    ProviderFailed(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored path was not a bare filename.
    #[error("CACHE_ERROR: invalid stored path: {0}")]
    InvalidStoredPath(String),
}

impl Error {
    /// Whether the failure came from the remote side rather than from local
    /// storage or bad input.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::FetchFailed(_) | Error::DecodeFailed(_) | Error::ResolveFailed(_) | Error::ProviderFailed(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
