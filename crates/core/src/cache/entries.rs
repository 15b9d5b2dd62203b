//! Cache entry CRUD operations.
//!
//! Provides get/set/delete for the icon and background cache tables. Both
//! tables share one row shape, so every operation takes a [`CacheTable`].

use super::connection::CacheDb;
use crate::Error;
use std::fmt;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Which cache table an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTable {
    Icons,
    Backgrounds,
}

impl CacheTable {
    fn name(self) -> &'static str {
        match self {
            CacheTable::Icons => "icon_cache",
            CacheTable::Backgrounds => "background_cache",
        }
    }
}

/// Where a cached asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Declared by the page itself (or served by the background provider).
    Site,
    /// The `/favicon.ico` fallback.
    Fallback,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Site => "site",
            Provenance::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "site" => Some(Provenance::Site),
            "fallback" => Some(Provenance::Fallback),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cache row: key → stored file, provenance, and when it was recorded.
///
/// `stored_path` is always a bare filename relative to the table's asset
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub cache_key: String,
    pub stored_path: String,
    pub provenance: Provenance,
    /// Page title for icon rows; `None` for backgrounds.
    pub title: Option<String>,
    /// RFC 3339 timestamp.
    pub recorded_at: String,
}

impl CacheEntry {
    /// Build an entry stamped with the current time.
    pub fn new(
        cache_key: impl Into<String>, stored_path: impl Into<String>, provenance: Provenance, title: Option<String>,
    ) -> Self {
        Self {
            cache_key: cache_key.into(),
            stored_path: stored_path.into(),
            provenance,
            title,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Check that a stored path is a bare filename that cannot escape its
/// directory when joined.
pub fn is_bare_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

impl CacheDb {
    /// Get the entry for `key`, if one was recorded.
    pub async fn get_entry(&self, table: CacheTable, key: &str) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let sql = format!(
                    "SELECT cache_key, stored_path, provenance, title, recorded_at
                     FROM {} WHERE cache_key = ?1",
                    table.name()
                );
                let mut stmt = conn.prepare(&sql)?;

                let result = stmt.query_row(params![key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                });

                match result {
                    Ok((cache_key, stored_path, provenance, title, recorded_at)) => {
                        // Rows that fail validation are treated like absent rows.
                        let Some(provenance) = Provenance::parse(&provenance) else {
                            tracing::warn!(key = %cache_key, %provenance, "ignoring cache row with unknown provenance");
                            return Ok(None);
                        };
                        if !is_bare_filename(&stored_path) {
                            tracing::warn!(key = %cache_key, %stored_path, "ignoring cache row with non-bare path");
                            return Ok(None);
                        }
                        Ok(Some(CacheEntry { cache_key, stored_path, provenance, title, recorded_at }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace the entry for `entry.cache_key`.
    ///
    /// Last write wins; concurrent writers for the same key store the same
    /// value.
    pub async fn upsert_entry(&self, table: CacheTable, entry: &CacheEntry) -> Result<(), Error> {
        if !is_bare_filename(&entry.stored_path) {
            return Err(Error::InvalidStoredPath(entry.stored_path.clone()));
        }

        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let sql = format!(
                    "INSERT INTO {} (cache_key, stored_path, provenance, title, recorded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(cache_key) DO UPDATE SET
                        stored_path = excluded.stored_path,
                        provenance = excluded.provenance,
                        title = excluded.title,
                        recorded_at = excluded.recorded_at",
                    table.name()
                );
                conn.execute(
                    &sql,
                    params![
                        &entry.cache_key,
                        &entry.stored_path,
                        entry.provenance.as_str(),
                        &entry.title,
                        &entry.recorded_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the entry for `key`.
    ///
    /// Returns whether a row was removed. The referenced file is left alone.
    pub async fn delete_entry(&self, table: CacheTable, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let sql = format!("DELETE FROM {} WHERE cache_key = ?1", table.name());
                let count = conn.execute(&sql, params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}
