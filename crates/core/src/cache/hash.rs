//! Cache key and content digest generation.

use sha2::{Digest, Sha256};

/// Compute the icon cache key for a canonical page URL.
pub fn icon_cache_key(page_url: &str) -> String {
    hex::encode(Sha256::digest(page_url.as_bytes()))
}

/// Compute the background cache key for a provider and optional query.
///
/// Providers without a query use their bare id so keys stay readable in the
/// database.
pub fn background_cache_key(provider_id: &str, query: Option<&str>) -> String {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => format!("{provider_id}:{q}"),
        None => provider_id.to_string(),
    }
}

/// Compute the salted content digest used to name a stored asset.
///
/// The digest covers `salt + ":" + bytes`, or the bytes alone when the salt is
/// empty.
pub fn content_digest(salt: &str, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    if !salt.is_empty() {
        hasher.update(salt.as_bytes());
        hasher.update(b":");
    }
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
