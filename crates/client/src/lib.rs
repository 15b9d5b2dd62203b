//! Asset resolution for homeport.
//!
//! This crate fetches remote pages and images under byte and time bounds,
//! extracts titles and icons, stores the results as content-addressed files,
//! and keeps the icon and background caches in `homeport-core` current.

pub mod assets;
pub mod background;
pub mod datauri;
pub mod extract;
pub mod fetch;
pub mod icon;
pub mod warmup;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use assets::{AssetWriter, content_type_for};
pub use background::{
    BackgroundService, BackgroundSettings, CachedImage, Freshness, ImageOrigin, ImageSource, Provider,
    ProviderResolver, ServedImage,
};
pub use fetch::{FetchClient, FetchConfig, FetchError, FetchLimits, FetchResponse, Fetcher};
pub use icon::{IconLimits, IconLookup, IconService};
pub use warmup::{spawn_background_warmup, spawn_icon_warmup};
