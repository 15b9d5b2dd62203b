//! Background wallpaper cache.
//!
//! ### Serving
//!
//! A cached file is served while its provider's [`Freshness`] rule says it is
//! fresh. A missing row, a row whose file is gone, or a stale file all trigger
//! the same remedy: ask the [`ImageSource`] for an image URL, download it,
//! write it, then record the row. If that fails upstream and a default image
//! is configured, the default is served instead.
//!
//! File age comes from the stored file's mtime, not from the row.

mod provider;

pub use provider::{Freshness, ImageSource, Provider, ProviderResolver};

use crate::assets::{AssetWriter, content_type_for};
use crate::fetch::{ACCEPT_IMAGE, FetchError, FetchLimits, Fetcher};
use homeport_core::{CacheDb, CacheEntry, CacheTable, Error, Provenance};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Tunables for [`BackgroundService`].
#[derive(Debug, Clone)]
pub struct BackgroundSettings {
    /// Bounds for image downloads.
    pub limits: FetchLimits,
    /// Refresh interval; zero means manual refresh only.
    pub interval: Duration,
    /// Image served when no provider image can be obtained.
    pub default_image: Option<PathBuf>,
}

/// Where a served image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    Cache,
    Fresh,
    Default,
}

/// An image ready to be streamed to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedImage {
    pub path: PathBuf,
    pub content_type: &'static str,
    pub origin: ImageOrigin,
}

/// A downloaded image stored in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub file_name: String,
    pub mime_type: String,
}

pub struct BackgroundService {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    source: Arc<dyn ImageSource>,
    writer: AssetWriter,
    settings: BackgroundSettings,
}

impl BackgroundService {
    pub fn new(
        db: CacheDb, fetcher: Arc<dyn Fetcher>, source: Arc<dyn ImageSource>, writer: AssetWriter,
        settings: BackgroundSettings,
    ) -> Self {
        Self { db, fetcher, source, writer, settings }
    }

    pub fn writer(&self) -> &AssetWriter {
        &self.writer
    }

    /// Return the image to show for `provider`, refreshing it if needed.
    ///
    /// # Errors
    ///
    /// Upstream failures are only returned when no default image is
    /// available. Write and database failures are always returned.
    pub async fn image(&self, provider: &Provider) -> Result<ServedImage, Error> {
        let key = provider.cache_key();

        if let Some(entry) = self.db.get_entry(CacheTable::Backgrounds, &key).await? {
            let rule = provider.freshness(self.settings.interval);
            match self.writer.age(&entry.stored_path).await {
                Some(age) if rule.is_fresh(age) => {
                    tracing::debug!(%provider, path = %entry.stored_path, age_secs = age.as_secs(), "background cache hit");
                    return self.served(&entry.stored_path, ImageOrigin::Cache);
                }
                Some(age) => tracing::debug!(%provider, age_secs = age.as_secs(), ?rule, "background stale"),
                None => tracing::debug!(%provider, path = %entry.stored_path, "cached background missing on disk"),
            }
        }

        match self.refresh(provider).await {
            Ok(image) => self.served(&image.file_name, ImageOrigin::Fresh),
            Err(e) if e.is_upstream() => self.default_or(provider, e).await,
            Err(e) => Err(e),
        }
    }

    /// Fetch a new image for `provider` regardless of freshness and record it.
    pub async fn refresh(&self, provider: &Provider) -> Result<CachedImage, Error> {
        let key = provider.cache_key();
        let url = self.source.image_url(provider).await?;
        let image = self.download(&url, &key).await?;

        let entry = CacheEntry::new(&key, &image.file_name, Provenance::Site, None);
        self.db.upsert_entry(CacheTable::Backgrounds, &entry).await?;

        tracing::info!(%provider, file = %image.file_name, "background refreshed");
        Ok(image)
    }

    /// Download `url` into the cache directory, naming it by `salt` and content.
    pub async fn download(&self, url: &Url, salt: &str) -> Result<CachedImage, Error> {
        let limits = self.settings.limits;
        let response = self
            .fetcher
            .fetch(url, ACCEPT_IMAGE, limits)
            .await?
            .require_complete(limits.max_bytes)?;

        let mime = response.mime();
        if let Some(m) = mime.as_deref()
            && (m.starts_with("text/") || m == "application/json")
        {
            return Err(FetchError::UnexpectedContentType(m.to_string()).into());
        }

        let ext = background_extension(mime.as_deref(), &response.final_url);
        let file_name = self.writer.write(&response.bytes, salt, ext).await?;
        let mime_type = mime.unwrap_or_else(|| content_type_for(&file_name).to_string());

        Ok(CachedImage { file_name, mime_type })
    }

    fn served(&self, name: &str, origin: ImageOrigin) -> Result<ServedImage, Error> {
        Ok(ServedImage { path: self.writer.path_of(name)?, content_type: content_type_for(name), origin })
    }

    async fn default_or(&self, provider: &Provider, err: Error) -> Result<ServedImage, Error> {
        let Some(path) = &self.settings.default_image else {
            return Err(err);
        };
        if !tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
            tracing::warn!(path = %path.display(), "default background missing");
            return Err(err);
        }

        tracing::warn!(%provider, error = %err, "background unavailable, serving default");
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Ok(ServedImage { path: path.clone(), content_type: content_type_for(&name), origin: ImageOrigin::Default })
    }
}

/// Extension for a downloaded background: declared media type first, then the
/// URL path, then `.jpg`.
fn background_extension(mime: Option<&str>, url: &Url) -> &'static str {
    let from_mime = match mime {
        Some("image/jpeg" | "image/jpg") => Some(".jpg"),
        Some("image/png") => Some(".png"),
        Some("image/webp") => Some(".webp"),
        Some("image/gif") => Some(".gif"),
        _ => None,
    };
    if let Some(ext) = from_mime {
        return ext;
    }

    let path = url.path().to_ascii_lowercase();
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => ".png",
        Some("webp") => ".webp",
        Some("gif") => ".gif",
        _ => ".jpg",
    }
}
