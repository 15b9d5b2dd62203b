//! Icon resolution and stored icon files.

use super::file_response;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use homeport_client::content_type_for;
use serde::{Deserialize, Serialize};

/// URL prefix icon files are served under.
pub const ICON_URL_PREFIX: &str = "/assets/icons/";

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveIconParams {
    pub url: String,
    /// Drop any cached result before resolving.
    #[serde(default)]
    pub refresh: bool,
}

/// Empty strings stand in for "no icon".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveIconOutput {
    pub title: String,
    pub icon_url: String,
    pub icon_path: String,
    /// `site`, `fallback`, or empty.
    pub icon_source: String,
}

pub async fn resolve(
    State(state): State<AppState>, payload: Result<Json<ResolveIconParams>, JsonRejection>,
) -> Result<Json<ResolveIconOutput>, ApiError> {
    let Json(params) = payload.map_err(|e| ApiError::BadRequest(format!("INVALID_INPUT: {}", e.body_text())))?;
    let lookup = state.icons.resolve(&params.url, params.refresh).await?;

    let icon_path = lookup.icon_path.unwrap_or_default();
    let icon_url = if icon_path.is_empty() { String::new() } else { format!("{ICON_URL_PREFIX}{icon_path}") };
    let icon_source = lookup.provenance.map(|p| p.to_string()).unwrap_or_default();

    Ok(Json(ResolveIconOutput { title: lookup.title, icon_url, icon_path, icon_source }))
}

pub async fn asset(State(state): State<AppState>, Path(file): Path<String>) -> Result<Response, ApiError> {
    let path = state
        .icons
        .writer()
        .path_of(&file)
        .map_err(|_| ApiError::NotFound(file.clone()))?;
    file_response(&path, content_type_for(&file)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_bytes, body_json, send, state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use homeport_client::testing::{PNG_1X1_BASE64, StubFetcher, png_1x1};
    use homeport_core::AppConfig;
    use std::sync::Arc;

    fn resolve_request(body: &str) -> Request<Body> {
        Request::post("/api/icon/resolve")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_then_serve_icon() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://grafana.example/", r#"<title>Grafana</title><link rel="icon" href="/fav.png">"#);
        stub.bytes("https://grafana.example/fav.png", Some("image/png"), &png_1x1());
        let state = state(dir.path(), &stub, AppConfig::default()).await;

        let response = send(state.clone(), resolve_request(r#"{"url":"https://grafana.example/"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["title"], "Grafana");
        assert_eq!(json["iconSource"], "site");
        let icon_path = json["iconPath"].as_str().unwrap().to_string();
        assert_eq!(json["iconUrl"], format!("/assets/icons/{icon_path}"));

        let response = send(state, Request::get(format!("/assets/icons/{icon_path}")).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(body_bytes(response).await, png_1x1());
    }

    #[tokio::test]
    async fn test_fallback_source() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.status("https://router.example/", 404);
        stub.bytes("https://router.example/favicon.ico", Some("image/x-icon"), b"ico");
        let state = state(dir.path(), &stub, AppConfig::default()).await;

        let json = body_json(send(state, resolve_request(r#"{"url":"https://router.example/"}"#)).await).await;
        assert_eq!(json["iconSource"], "fallback");
        assert_eq!(json["title"], "");
    }

    #[tokio::test]
    async fn test_data_uri_icon() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html(
            "https://inline.example/",
            &format!(r#"<title>I</title><link rel="icon" href="data:image/png;base64,{PNG_1X1_BASE64}">"#),
        );
        let state = state(dir.path(), &stub, AppConfig::default()).await;

        let json = body_json(send(state, resolve_request(r#"{"url":"https://inline.example/"}"#)).await).await;
        assert_eq!(json["iconSource"], "site");
        assert!(json["iconPath"].as_str().unwrap().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_title_only_has_empty_icon_fields() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://wiki.example/", "<title>Wiki</title>");
        let state = state(dir.path(), &stub, AppConfig::default()).await;

        let response = send(state, resolve_request(r#"{"url":"https://wiki.example/"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(
            json,
            serde_json::json!({ "title": "Wiki", "iconUrl": "", "iconPath": "", "iconSource": "" })
        );
    }

    #[tokio::test]
    async fn test_refresh_refetches() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://nas.example/", r#"<title>NAS</title><link rel="icon" href="/i.png">"#);
        stub.bytes("https://nas.example/i.png", Some("image/png"), &png_1x1());
        let state = state(dir.path(), &stub, AppConfig::default()).await;

        let first = body_json(send(state.clone(), resolve_request(r#"{"url":"https://nas.example/"}"#)).await).await;
        let calls = stub.calls();
        let cached = body_json(send(state.clone(), resolve_request(r#"{"url":"https://nas.example/"}"#)).await).await;
        assert_eq!(stub.calls(), calls);

        let refreshed =
            body_json(send(state, resolve_request(r#"{"url":"https://nas.example/","refresh":true}"#)).await).await;
        assert!(stub.calls() > calls);
        assert_eq!(first["iconPath"], cached["iconPath"]);
        assert_eq!(first["iconPath"], refreshed["iconPath"]);
    }

    #[tokio::test]
    async fn test_invalid_url_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        let state = state(dir.path(), &stub, AppConfig::default()).await;

        let response = send(state, resolve_request(r#"{"url":"nas.local"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().starts_with("INVALID_INPUT"));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        let state = state(dir.path(), &stub, AppConfig::default()).await;

        let response = send(state, resolve_request(r#"{"link":"https://a.example/"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_nothing_resolved_is_502() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        let state = state(dir.path(), &stub, AppConfig::default()).await;

        let response = send(state, resolve_request(r#"{"url":"https://offline.example/"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unknown_or_unsafe_asset_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        let state = state(dir.path(), &stub, AppConfig::default()).await;
        std::fs::write(dir.path().join("secret.txt"), b"secret").unwrap();

        for uri in ["/assets/icons/missing.png", "/assets/icons/..%2Fsecret.txt", "/assets/icons/.."] {
            let response = send(state.clone(), Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }
}
