//! HTTP routes.
//!
//! ### Endpoints
//! - `POST /api/icon/resolve`: title and icon for a page URL
//! - `GET /assets/icons/{file}`: stored icon files
//! - `GET /api/background/image`: current background image
//! - `POST /api/background/refresh`: force a new background
//! - `GET /healthz`: liveness

pub mod background;
pub mod health;
pub mod icon;

use crate::error::ApiError;
use crate::state::AppState;
use axum::Router;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::path::Path;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/icon/resolve", post(icon::resolve))
        .route("/assets/icons/{file}", get(icon::asset))
        .route("/api/background/image", get(background::image))
        .route("/api/background/refresh", post(background::refresh))
        .route("/healthz", get(health::healthz))
        .with_state(state)
}

/// Read a file into an uncacheable response.
async fn file_response(path: &Path, content_type: &'static str) -> Result<Response, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ApiError::NotFound(path.display().to_string()),
        _ => ApiError::Internal(format!("failed to read {}: {e}", path.display())),
    })?;

    Ok(([(header::CONTENT_TYPE, content_type), (header::CACHE_CONTROL, "no-store")], bytes).into_response())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use homeport_client::testing::StubFetcher;
    use homeport_core::{AppConfig, CacheDb};
    use std::sync::Arc;
    use tower::ServiceExt;

    pub(crate) async fn state(data_dir: &std::path::Path, stub: &Arc<StubFetcher>, config: AppConfig) -> AppState {
        let config = AppConfig { data_dir: data_dir.to_path_buf(), ..config };
        let db = CacheDb::open_in_memory().await.unwrap();
        AppState::with_db(config, db, stub.clone()).await.unwrap()
    }

    pub(crate) async fn send(state: AppState, request: Request<Body>) -> Response<Body> {
        super::router(state).oneshot(request).await.unwrap()
    }

    pub(crate) async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    pub(crate) async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }
}
