//! HTTP error mapping for the homeport server.
//!
//! Client mistakes are 400s, remote failures are 502s, and anything local
//! (disk, database) is a 500. Bodies are `{"error": "<CODE>: <message>"}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use homeport_core::Error;

/// Errors returned by route handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request or unknown parameter value.
    #[error("{0}")]
    BadRequest(String),

    /// No such asset.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// The remote side could not provide what was asked for.
    #[error("{0}")]
    BadGateway(String),

    /// Local storage failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::InvalidInput(_) => ApiError::BadRequest(err.to_string()),
            e if e.is_upstream() => ApiError::BadGateway(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (Error::InvalidInput("no host".into()), StatusCode::BAD_REQUEST),
            (Error::ResolveFailed("nothing".into()), StatusCode::BAD_GATEWAY),
            (Error::FetchFailed("503".into()), StatusCode::BAD_GATEWAY),
            (Error::ProviderFailed("no key".into()), StatusCode::BAD_GATEWAY),
            (Error::WriteFailed(std::io::Error::other("disk full")), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::MigrationFailed("001".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_message_keeps_code() {
        let err = ApiError::from(Error::InvalidInput("missing scheme".into()));
        assert_eq!(err.to_string(), "INVALID_INPUT: missing scheme");
        assert_eq!(ApiError::NotFound("x.png".into()).to_string(), "NOT_FOUND: x.png");
    }
}
