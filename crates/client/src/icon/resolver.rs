//! Icon resolution state machine.
//!
//! ```text
//! FetchPage ──ok──▶ Extract ──icon──▶ SiteIcon ──ok──▶ done(site)
//!     │                │                 │
//!     └──err───────────┴──none───────────┴──err──▶ Fallback ──ok──▶ done(fallback)
//!                                                     └──err──▶ title only / ResolveFailed
//! ```
//!
//! Fetch and decode failures move one step down the chain. Write failures end
//! resolution immediately, since retrying another source cannot fix the disk.

use crate::assets::AssetWriter;
use crate::datauri::{self, DataUriError, extension_for_media_type};
use crate::extract::{extract_page_meta, icons::is_data_uri};
use crate::fetch::{ACCEPT_HTML, ACCEPT_IMAGE, FetchError, FetchLimits, FetchResponse, Fetcher};
use homeport_core::{Error, Provenance};
use std::sync::Arc;
use url::Url;

/// Byte and time bounds for the two kinds of fetch the resolver makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IconLimits {
    pub html: FetchLimits,
    pub icon: FetchLimits,
}

/// Outcome of resolving one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconResolution {
    pub title: String,
    /// Bare filename inside the icon directory.
    pub icon_path: Option<String>,
    pub provenance: Option<Provenance>,
}

impl IconResolution {
    fn found(title: String, icon_path: String, provenance: Provenance) -> Self {
        Self { title, icon_path: Some(icon_path), provenance: Some(provenance) }
    }

    fn title_only(title: String) -> Self {
        Self { title, icon_path: None, provenance: None }
    }
}

enum Step {
    FetchPage,
    Extract(FetchResponse),
    SiteIcon(String),
    Fallback,
}

#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DataUriError),
    #[error("invalid icon URL: {0}")]
    BadHref(String),
    #[error(transparent)]
    Write(Error),
}

/// Chains page fetch → extraction → icon fetch → `/favicon.ico`.
pub struct IconResolver {
    fetcher: Arc<dyn Fetcher>,
    writer: AssetWriter,
    limits: IconLimits,
}

impl IconResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, writer: AssetWriter, limits: IconLimits) -> Self {
        Self { fetcher, writer, limits }
    }

    pub fn writer(&self) -> &AssetWriter {
        &self.writer
    }

    /// Resolve the title and icon for an already-validated page URL.
    ///
    /// `salt` names the stored file (see [`AssetWriter::write`]); callers pass
    /// the page's cache key.
    ///
    /// # Errors
    ///
    /// - `Error::WriteFailed` if an icon was obtained but could not be stored
    /// - `Error::ResolveFailed` if neither an icon nor a title was found
    pub async fn resolve(&self, page_url: &Url, salt: &str) -> Result<IconResolution, Error> {
        let mut title = String::new();
        let mut base = page_url.clone();
        let mut step = Step::FetchPage;

        loop {
            step = match step {
                Step::FetchPage => match self.fetch_page(page_url, &mut base).await {
                    Ok(response) => Step::Extract(response),
                    Err(e) => {
                        tracing::debug!(url = %page_url, error = %e, "page fetch failed, trying fallback");
                        Step::Fallback
                    }
                },
                Step::Extract(response) => {
                    let meta = extract_page_meta(&response.bytes, &response.final_url);
                    title = meta.title;
                    match meta.icon {
                        Some(href) => Step::SiteIcon(href),
                        None => {
                            tracing::debug!(url = %base, "page declares no icon");
                            Step::Fallback
                        }
                    }
                }
                Step::SiteIcon(href) => match self.site_icon(&href, salt).await {
                    Ok(name) => return Ok(IconResolution::found(title, name, Provenance::Site)),
                    Err(AttemptError::Write(e)) => return Err(e),
                    Err(e) => {
                        tracing::debug!(url = %base, error = %e, "declared icon unusable, trying fallback");
                        Step::Fallback
                    }
                },
                Step::Fallback => {
                    return match self.fallback_icon(&base, salt).await {
                        Ok(name) => Ok(IconResolution::found(title, name, Provenance::Fallback)),
                        Err(AttemptError::Write(e)) => Err(e),
                        Err(e) if !title.is_empty() => {
                            tracing::debug!(url = %base, error = %e, "no icon found, returning title only");
                            Ok(IconResolution::title_only(title))
                        }
                        Err(e) => Err(Error::ResolveFailed(format!("{page_url}: {e}"))),
                    };
                }
            };
        }
    }

    /// Fetch the page, pointing `base` at wherever the redirects ended up,
    /// including for responses that are then rejected.
    async fn fetch_page(&self, url: &Url, base: &mut Url) -> Result<FetchResponse, FetchError> {
        let response = match self.fetcher.fetch(url, ACCEPT_HTML, self.limits.html).await {
            Ok(response) => response,
            Err(e) => {
                if let FetchError::BadStatus { final_url, .. } = &e {
                    *base = final_url.clone();
                }
                return Err(e);
            }
        };
        *base = response.final_url.clone();

        if let Some(mime) = response.mime()
            && !mime.contains("html")
        {
            return Err(FetchError::UnexpectedContentType(mime));
        }
        Ok(response)
    }

    async fn site_icon(&self, href: &str, salt: &str) -> Result<String, AttemptError> {
        if is_data_uri(href) {
            let decoded = datauri::decode(href)?;
            return self
                .writer
                .write(&decoded.bytes, salt, decoded.extension())
                .await
                .map_err(AttemptError::Write);
        }

        let url = Url::parse(href).map_err(|_| AttemptError::BadHref(href.to_string()))?;
        self.download_icon(&url, salt).await
    }

    async fn fallback_icon(&self, base: &Url, salt: &str) -> Result<String, AttemptError> {
        let url = base
            .join("/favicon.ico")
            .map_err(|_| AttemptError::BadHref(base.to_string()))?;
        self.download_icon(&url, salt).await
    }

    async fn download_icon(&self, url: &Url, salt: &str) -> Result<String, AttemptError> {
        let response = self
            .fetcher
            .fetch(url, ACCEPT_IMAGE, self.limits.icon)
            .await?
            .require_complete(self.limits.icon.max_bytes)?;

        let mime = response.mime();
        // Soft-404 pages come back as 200 text/html; never store those as icons.
        if let Some(m) = mime.as_deref()
            && m.starts_with("text/html")
        {
            return Err(FetchError::UnexpectedContentType(m.to_string()).into());
        }

        let ext = image_extension(&response.final_url, mime.as_deref());
        self.writer
            .write(&response.bytes, salt, ext)
            .await
            .map_err(AttemptError::Write)
    }
}

/// Best-effort extension for a downloaded image: URL path first, then the
/// declared media type, then `.ico`.
pub(crate) fn image_extension(url: &Url, mime: Option<&str>) -> &'static str {
    let path = url.path().to_ascii_lowercase();
    let from_path = match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => Some(".png"),
        Some("ico") => Some(".ico"),
        Some("svg") => Some(".svg"),
        Some("webp") => Some(".webp"),
        Some("gif") => Some(".gif"),
        Some("jpg" | "jpeg") => Some(".jpg"),
        _ => None,
    };
    from_path.unwrap_or_else(|| extension_for_media_type(mime.unwrap_or("")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{PNG_1X1_BASE64, StubFetcher, png_1x1};
    use homeport_core::cache::hash::content_digest;
    use std::time::Duration;

    const SALT: &str = "salt";

    fn limits() -> IconLimits {
        IconLimits {
            html: FetchLimits::new(2 * 1024 * 1024, Duration::from_secs(15)),
            icon: FetchLimits::new(1024 * 1024, Duration::from_secs(15)),
        }
    }

    fn resolver(stub: &Arc<StubFetcher>, dir: &std::path::Path) -> IconResolver {
        IconResolver::new(stub.clone(), AssetWriter::new(dir), limits())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_declared_icon() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html(
            "https://example.com/",
            r#"<title>Example</title><link rel="icon" href="/static/icon.png">"#,
        );
        stub.bytes("https://example.com/static/icon.png", Some("image/png"), &png_1x1());

        let result = resolver(&stub, dir.path()).resolve(&url("https://example.com/"), SALT).await.unwrap();

        assert_eq!(result.title, "Example");
        assert_eq!(result.provenance, Some(Provenance::Site));
        let name = result.icon_path.unwrap();
        assert_eq!(name, format!("{}.png", content_digest(SALT, &png_1x1())));
        assert!(dir.path().join(&name).is_file());
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_page_404_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.status("https://example.com/app", 404);
        stub.bytes("https://example.com/favicon.ico", Some("image/x-icon"), b"\x00\x00\x01\x00icon");

        let result = resolver(&stub, dir.path()).resolve(&url("https://example.com/app"), SALT).await.unwrap();

        assert_eq!(result.title, "");
        assert_eq!(result.provenance, Some(Provenance::Fallback));
        assert!(result.icon_path.unwrap().ends_with(".ico"));
        assert_eq!(stub.requested(), vec!["https://example.com/app", "https://example.com/favicon.ico"]);
    }

    #[tokio::test]
    async fn test_data_uri_icon() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html(
            "https://inline.example/",
            &format!(r#"<title>Inline</title><link rel="icon" href="data:image/png;base64,{PNG_1X1_BASE64}">"#),
        );

        let result = resolver(&stub, dir.path()).resolve(&url("https://inline.example/"), SALT).await.unwrap();

        assert_eq!(result.provenance, Some(Provenance::Site));
        assert!(result.icon_path.unwrap().ends_with(".png"));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn test_bad_data_uri_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://broken.example/", r#"<title>B</title><link rel="icon" href="data:image/png;base64,">"#);
        stub.bytes("https://broken.example/favicon.ico", None, b"ico-bytes");

        let result = resolver(&stub, dir.path()).resolve(&url("https://broken.example/"), SALT).await.unwrap();
        assert_eq!(result.provenance, Some(Provenance::Fallback));
    }

    #[tokio::test]
    async fn test_icon_fetch_failure_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://example.com/", r#"<link rel="apple-touch-icon" href="/touch.png">"#);
        stub.timeout("https://example.com/touch.png");
        stub.bytes("https://example.com/favicon.ico", Some("image/vnd.microsoft.icon"), b"ico");

        let result = resolver(&stub, dir.path()).resolve(&url("https://example.com/"), SALT).await.unwrap();
        assert_eq!(result.provenance, Some(Provenance::Fallback));
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn test_fallback_uses_final_url_origin() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.redirect_html("http://short.example/", "https://www.target.example/home", "<title>Target</title>");
        stub.bytes("https://www.target.example/favicon.ico", Some("image/x-icon"), b"ico");

        let result = resolver(&stub, dir.path()).resolve(&url("http://short.example/"), SALT).await.unwrap();
        assert_eq!(result.title, "Target");
        assert_eq!(result.provenance, Some(Provenance::Fallback));
        assert_eq!(stub.calls_to("http://short.example/favicon.ico"), 0);
    }

    #[tokio::test]
    async fn test_non_html_page_falls_back_on_final_origin() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.redirect_bytes("http://short.example/", "https://www.target.example/app", "application/json", b"{}");
        stub.bytes("https://www.target.example/favicon.ico", Some("image/x-icon"), b"ico");

        let result = resolver(&stub, dir.path()).resolve(&url("http://short.example/"), SALT).await.unwrap();
        assert_eq!(result.provenance, Some(Provenance::Fallback));
        assert_eq!(
            stub.requested(),
            vec!["http://short.example/".to_string(), "https://www.target.example/favicon.ico".to_string()]
        );
    }

    #[tokio::test]
    async fn test_error_page_falls_back_on_final_origin() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.redirect_status("http://short.example/", "https://www.target.example/login", 401);
        stub.bytes("https://www.target.example/favicon.ico", Some("image/x-icon"), b"ico");

        let result = resolver(&stub, dir.path()).resolve(&url("http://short.example/"), SALT).await.unwrap();
        assert_eq!(result.provenance, Some(Provenance::Fallback));
        assert_eq!(stub.calls_to("http://short.example/favicon.ico"), 0);
    }

    #[tokio::test]
    async fn test_title_only_when_no_icon_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://plain.example/", "<title>Plain</title>");

        let result = resolver(&stub, dir.path()).resolve(&url("https://plain.example/"), SALT).await.unwrap();
        assert_eq!(result, IconResolution::title_only("Plain".to_string()));
    }

    #[tokio::test]
    async fn test_nothing_found_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());

        let result = resolver(&stub, dir.path()).resolve(&url("https://gone.example/"), SALT).await;
        assert!(matches!(result, Err(Error::ResolveFailed(_))));
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_html_page_skips_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.bytes("https://api.example/", Some("application/json"), br#"{"title":"nope"}"#);
        stub.bytes("https://api.example/favicon.ico", Some("image/x-icon"), b"ico");

        let result = resolver(&stub, dir.path()).resolve(&url("https://api.example/"), SALT).await.unwrap();
        assert_eq!(result.title, "");
        assert_eq!(result.provenance, Some(Provenance::Fallback));
    }

    #[tokio::test]
    async fn test_html_soft_404_icon_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://spa.example/", "<title>SPA</title>");
        stub.bytes("https://spa.example/favicon.ico", Some("text/html"), b"<html>not found</html>");

        let result = resolver(&stub, dir.path()).resolve(&url("https://spa.example/"), SALT).await.unwrap();
        assert_eq!(result, IconResolution::title_only("SPA".to_string()));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_icon_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://big.example/", r#"<title>Big</title><link rel="icon" href="/huge.png">"#);
        stub.bytes("https://big.example/huge.png", Some("image/png"), &vec![7u8; 2 * 1024 * 1024]);

        let result = resolver(&stub, dir.path()).resolve(&url("https://big.example/"), SALT).await.unwrap();
        assert_eq!(result.icon_path, None);
        assert_eq!(result.title, "Big");
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubFetcher::new());
        stub.html("https://example.com/", r#"<title>T</title><link rel="icon" href="/i.png">"#);
        stub.bytes("https://example.com/i.png", Some("image/png"), b"png");
        stub.bytes("https://example.com/favicon.ico", Some("image/x-icon"), b"ico");

        let missing = dir.path().join("does-not-exist");
        let resolver = IconResolver::new(stub.clone(), AssetWriter::new(&missing), limits());

        let result = resolver.resolve(&url("https://example.com/"), SALT).await;
        assert!(matches!(result, Err(Error::WriteFailed(_))));
        assert_eq!(stub.calls_to("https://example.com/favicon.ico"), 0);
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(&url("https://e.com/a.PNG"), None), ".png");
        assert_eq!(image_extension(&url("https://e.com/a.jpeg"), Some("image/png")), ".jpg");
        assert_eq!(image_extension(&url("https://e.com/icon"), Some("image/svg+xml")), ".svg");
        assert_eq!(image_extension(&url("https://e.com/icon"), None), ".ico");
    }
}
