//! Background image serving and manual refresh.

use super::file_response;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::response::Response;
use homeport_client::Provider;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshParams {
    /// Provider id; the configured provider when absent.
    pub provider: Option<String>,
    pub query: Option<String>,
}

pub async fn image(State(state): State<AppState>) -> Result<Response, ApiError> {
    let served = state.backgrounds.image(&state.provider).await?;
    file_response(&served.path, served.content_type).await
}

pub async fn refresh(State(state): State<AppState>, Query(params): Query<RefreshParams>) -> Result<Json<Value>, ApiError> {
    let provider = match params.provider.as_deref() {
        Some(id) => Provider::parse(id, params.query.as_deref())?,
        None => state.provider.clone(),
    };

    let image = state.backgrounds.refresh(&provider).await?;
    tracing::debug!(%provider, file = %image.file_name, mime = %image.mime_type, "manual background refresh");
    Ok(Json(json!({ "ok": true })))
}
