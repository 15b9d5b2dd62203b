//! Core types and shared functionality for homeport.
//!
//! This crate provides:
//! - Cache store for resolved icons and backgrounds (SQLite backend)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheTable, Provenance};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
