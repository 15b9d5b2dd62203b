//! Page icon lookup backed by the icon cache table.
//!
//! ### Flow
//!
//! 1. Canonicalize the requested URL and hash it into a cache key
//! 2. On `refresh`, drop the existing row first
//! 3. A row whose file is still on disk is a hit and needs no fetch
//! 4. Otherwise run [`IconResolver`] and record the result
//!
//! Rows are only written after the icon file is in place, and only when an
//! icon was actually stored. Title-only results are returned but not cached.

mod resolver;

pub use resolver::{IconLimits, IconResolution, IconResolver};

use crate::assets::AssetWriter;
use crate::fetch::{Fetcher, canonicalize};
use homeport_core::cache::hash::icon_cache_key;
use homeport_core::{CacheDb, CacheEntry, CacheTable, Error, Provenance};
use std::sync::Arc;

/// Result of an icon lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconLookup {
    pub title: String,
    pub icon_path: Option<String>,
    pub provenance: Option<Provenance>,
    /// Whether the answer came from the cache without any fetch.
    pub cached: bool,
}

impl From<IconResolution> for IconLookup {
    fn from(r: IconResolution) -> Self {
        Self { title: r.title, icon_path: r.icon_path, provenance: r.provenance, cached: false }
    }
}

/// Cached icon resolution.
pub struct IconService {
    db: CacheDb,
    resolver: IconResolver,
}

impl IconService {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, writer: AssetWriter, limits: IconLimits) -> Self {
        Self { db, resolver: IconResolver::new(fetcher, writer, limits) }
    }

    pub fn writer(&self) -> &AssetWriter {
        self.resolver.writer()
    }

    /// Look up the title and icon for `raw_url`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidInput` for URLs without an http(s) scheme or host
    /// - `Error::ResolveFailed` when neither title nor icon could be found
    /// - `Error::WriteFailed` / `Error::Database` for local storage failures
    pub async fn resolve(&self, raw_url: &str, refresh: bool) -> Result<IconLookup, Error> {
        let url = canonicalize(raw_url)?;
        let key = icon_cache_key(url.as_str());

        if refresh {
            let removed = self.db.delete_entry(CacheTable::Icons, &key).await?;
            tracing::debug!(%url, removed, "icon refresh requested");
        } else if let Some(hit) = self.cached(&key).await? {
            tracing::debug!(%url, path = ?hit.icon_path, "icon cache hit");
            return Ok(hit);
        }

        let resolution = self.resolver.resolve(&url, &key).await?;

        if let (Some(path), Some(provenance)) = (&resolution.icon_path, resolution.provenance) {
            let entry = CacheEntry::new(&key, path, provenance, Some(resolution.title.clone()));
            self.db.upsert_entry(CacheTable::Icons, &entry).await?;
            tracing::info!(%url, %path, %provenance, "icon resolved");
        } else {
            tracing::info!(%url, "no icon found");
        }

        Ok(resolution.into())
    }

    /// A row is only a hit if its file still exists.
    async fn cached(&self, key: &str) -> Result<Option<IconLookup>, Error> {
        let Some(entry) = self.db.get_entry(CacheTable::Icons, key).await? else {
            return Ok(None);
        };

        if !self.writer().exists(&entry.stored_path).await {
            tracing::debug!(path = %entry.stored_path, "cached icon missing on disk, re-resolving");
            return Ok(None);
        }

        Ok(Some(IconLookup {
            title: entry.title.unwrap_or_default(),
            icon_path: Some(entry.stored_path),
            provenance: Some(entry.provenance),
            cached: true,
        }))
    }
}
