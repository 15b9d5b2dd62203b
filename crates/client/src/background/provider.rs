//! Background image providers and their freshness rules.

use crate::fetch::{ACCEPT_JSON, FetchLimits, Fetcher};
use async_trait::async_trait;
use homeport_core::Error;
use homeport_core::cache::hash::background_cache_key;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const BING_FEED_URL: &str = "https://www.bing.com/HPImageArchive.aspx?format=js&idx=0&n=1&mkt=en-US";
const BING_BASE_URL: &str = "https://www.bing.com/";
const PICSUM_URL: &str = "https://picsum.photos/1920/1080";
const UNSPLASH_RANDOM_URL: &str = "https://api.unsplash.com/photos/random";
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A wallpaper source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Bing image of the day.
    Bing,
    /// Random Lorem Picsum landscape.
    Picsum,
    /// Random Unsplash photo, optionally narrowed by a search query.
    Unsplash { query: Option<String> },
}

impl Provider {
    /// Parse a provider id. The query is only kept for providers that use it.
    pub fn parse(id: &str, query: Option<&str>) -> Result<Self, Error> {
        let query = query.map(str::trim).filter(|q| !q.is_empty()).map(String::from);
        match id.trim().to_ascii_lowercase().as_str() {
            "bing" => Ok(Self::Bing),
            "picsum" => Ok(Self::Picsum),
            "unsplash" => Ok(Self::Unsplash { query }),
            other => Err(Error::InvalidInput(format!("unknown background provider: {other}"))),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::Bing => "bing",
            Self::Picsum => "picsum",
            Self::Unsplash { .. } => "unsplash",
        }
    }

    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Unsplash { query } => query.as_deref(),
            _ => None,
        }
    }

    /// Row key in the background cache table.
    pub fn cache_key(&self) -> String {
        background_cache_key(self.id(), self.query())
    }

    /// Freshness rule for this provider under the configured interval.
    ///
    /// A zero interval means manual refresh only and wins over everything.
    /// Otherwise daily providers ignore the interval.
    pub fn freshness(&self, interval: Duration) -> Freshness {
        if interval.is_zero() {
            return Freshness::Manual;
        }
        match self {
            Self::Bing => Freshness::Daily,
            Self::Picsum | Self::Unsplash { .. } => Freshness::Every(interval),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// When a cached file should be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Never stale; only an explicit refresh replaces it.
    Manual,
    /// Stale after 24 hours.
    Daily,
    /// Stale after the given age.
    Every(Duration),
}

impl Freshness {
    pub fn is_fresh(self, age: Duration) -> bool {
        match self {
            Self::Manual => true,
            Self::Daily => age < DAY,
            Self::Every(max) => age < max,
        }
    }
}

/// Turns a provider into the URL of an image to download.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn image_url(&self, provider: &Provider) -> Result<Url, Error>;
}

#[derive(Debug, Deserialize)]
struct BingFeed {
    images: Vec<BingImage>,
}

#[derive(Debug, Deserialize)]
struct BingImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    urls: UnsplashUrls,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    raw: String,
}

/// [`ImageSource`] backed by the public provider APIs.
pub struct ProviderResolver {
    fetcher: Arc<dyn Fetcher>,
    limits: FetchLimits,
    unsplash_key: Option<String>,
}

impl ProviderResolver {
    /// `limits` bounds the provider API calls, not the image downloads.
    pub fn new(fetcher: Arc<dyn Fetcher>, limits: FetchLimits, unsplash_key: Option<String>) -> Self {
        let unsplash_key = unsplash_key.filter(|k| !k.trim().is_empty());
        Self { fetcher, limits, unsplash_key }
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, Error> {
        let response = self
            .fetcher
            .fetch(url, ACCEPT_JSON, self.limits)
            .await?
            .require_complete(self.limits.max_bytes)?;
        serde_json::from_slice(&response.bytes)
            .map_err(|e| Error::ProviderFailed(format!("unexpected response from {}: {e}", url.host_str().unwrap_or(""))))
    }

    async fn bing(&self) -> Result<Url, Error> {
        let feed_url = Url::parse(BING_FEED_URL).map_err(|e| Error::ProviderFailed(e.to_string()))?;
        let feed: BingFeed = self.fetch_json(&feed_url).await?;
        let image = feed
            .images
            .first()
            .ok_or_else(|| Error::ProviderFailed("bing returned no images".into()))?;

        Url::parse(BING_BASE_URL)
            .and_then(|base| base.join(&image.url))
            .map_err(|e| Error::ProviderFailed(format!("bad bing image url {}: {e}", image.url)))
    }

    async fn unsplash(&self, query: Option<&str>) -> Result<Url, Error> {
        let key = self
            .unsplash_key
            .as_deref()
            .ok_or_else(|| Error::ProviderFailed("unsplash access key not configured".into()))?;

        let mut params = vec![("orientation", "landscape"), ("client_id", key)];
        if let Some(q) = query {
            params.push(("query", q));
        }
        let api_url =
            Url::parse_with_params(UNSPLASH_RANDOM_URL, &params).map_err(|e| Error::ProviderFailed(e.to_string()))?;

        let photo: UnsplashPhoto = self.fetch_json(&api_url).await?;
        let mut url = Url::parse(&photo.urls.raw)
            .map_err(|e| Error::ProviderFailed(format!("bad unsplash image url {}: {e}", photo.urls.raw)))?;
        url.query_pairs_mut()
            .append_pair("w", "2560")
            .append_pair("fm", "jpg")
            .append_pair("q", "80");
        Ok(url)
    }
}

#[async_trait]
impl ImageSource for ProviderResolver {
    async fn image_url(&self, provider: &Provider) -> Result<Url, Error> {
        match provider {
            Provider::Bing => self.bing().await,
            Provider::Picsum => Url::parse(PICSUM_URL).map_err(|e| Error::ProviderFailed(e.to_string())),
            Provider::Unsplash { query } => self.unsplash(query.as_deref()).await,
        }
    }
}
