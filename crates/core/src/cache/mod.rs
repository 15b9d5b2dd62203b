//! SQLite-backed cache store for resolved assets.
//!
//! This module maps a cache key to the bare filename of an asset that was
//! written to disk, along with its provenance and the time it was recorded.
//! Two tables share the same row shape:
//!
//! - `icon_cache`, keyed by a SHA-256 of the canonical page URL
//! - `background_cache`, keyed by provider id plus optional query
//!
//! Rows are hints. The filesystem is authoritative for whether an asset
//! exists, so a row pointing at a vanished file is treated as a miss.

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, CacheTable, Provenance, is_bare_filename};
