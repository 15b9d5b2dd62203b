//! Content-addressable asset files.
//!
//! Assets are named `<digest><ext>`, where the digest is a SHA-256 over
//! `salt:bytes`. Salting with the requesting cache key keeps two requests that
//! resolve to identical bytes on separate files, while the same request
//! resolved twice lands on the same name.
//!
//! Writes go to a temp file in the same directory and are published by a
//! rename, so readers see either no file or a complete one. The file work runs
//! on the blocking pool: a caller that stops waiting does not stop the write,
//! and a temp file that never gets published is removed when it drops.
//!
//! Writing bytes that are already stored bumps the file's mtime, since
//! [`AssetWriter::age`] is what freshness checks are measured against.

use homeport_core::Error;
use homeport_core::cache::hash::content_digest;
use homeport_core::cache::is_bare_filename;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Writes and locates assets inside one directory.
#[derive(Debug, Clone)]
pub struct AssetWriter {
    dir: PathBuf,
}

impl AssetWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the asset directory if it is missing.
    pub async fn ensure_dir(&self) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Absolute path for a stored filename.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, Error> {
        if !is_bare_filename(name) {
            return Err(Error::InvalidStoredPath(name.to_string()));
        }
        Ok(self.dir.join(name))
    }

    /// Whether `name` exists as a regular file.
    pub async fn exists(&self, name: &str) -> bool {
        match self.path_of(name) {
            Ok(path) => tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()),
            Err(_) => false,
        }
    }

    /// Time since `name` was last written, or `None` if it is missing.
    pub async fn age(&self, name: &str) -> Option<Duration> {
        let path = self.path_of(name).ok()?;
        let meta = tokio::fs::metadata(path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        let modified = meta.modified().ok()?;
        // Clock skew can put mtime in the future; treat that as brand new.
        Some(SystemTime::now().duration_since(modified).unwrap_or(Duration::ZERO))
    }

    /// Store `bytes` and return the bare filename.
    ///
    /// `ext` may be given with or without the leading dot.
    pub async fn write(&self, bytes: &[u8], salt: &str, ext: &str) -> Result<String, Error> {
        let ext = ext.trim_start_matches('.');
        let name = format!("{}.{}", content_digest(salt, bytes), ext);
        let final_path = self.path_of(&name)?;

        let dir = self.dir.clone();
        let owned = bytes.to_vec();
        let outcome = tokio::task::spawn_blocking(move || store(&dir, &final_path, &owned))
            .await
            .map_err(std::io::Error::other)??;

        match outcome {
            Stored::Touched => tracing::debug!(%name, "asset already stored, mtime refreshed"),
            Stored::Written => tracing::debug!(%name, bytes = bytes.len(), "asset stored"),
        }
        Ok(name)
    }
}

enum Stored {
    Written,
    Touched,
}

fn store(dir: &Path, final_path: &Path, bytes: &[u8]) -> std::io::Result<Stored> {
    if final_path.is_file() {
        std::fs::File::options()
            .write(true)
            .open(final_path)?
            .set_modified(SystemTime::now())?;
        return Ok(Stored::Touched);
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(final_path).map_err(|e| e.error)?;
    Ok(Stored::Written)
}

/// Media type to serve a stored asset with, from its extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}
