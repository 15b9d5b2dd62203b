//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HOMEPORT_*)
//! 2. TOML config file (if HOMEPORT_CONFIG_FILE set)
//! 3. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Background provider ids accepted in configuration.
pub const BACKGROUND_PROVIDERS: &[&str] = &["bing", "picsum", "unsplash"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HOMEPORT_*)
/// 2. TOML config file (if HOMEPORT_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory for cached assets. Icons live in `<data_dir>/icons`,
    /// backgrounds in `<data_dir>/cache`.
    ///
    /// Set via HOMEPORT_DATA_DIR environment variable.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Path to SQLite cache database. Defaults to `<data_dir>/homeport.sqlite`.
    ///
    /// Set via HOMEPORT_DB_PATH environment variable.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Address the HTTP server binds to.
    ///
    /// Set via HOMEPORT_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// User-Agent string for outbound HTTP requests.
    ///
    /// Set via HOMEPORT_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Byte ceiling for fetched HTML pages.
    #[serde(default = "default_html_max_bytes")]
    pub html_max_bytes: usize,

    /// Byte ceiling for fetched icons.
    #[serde(default = "default_icon_max_bytes")]
    pub icon_max_bytes: usize,

    /// Byte ceiling for fetched background images.
    #[serde(default = "default_background_max_bytes")]
    pub background_max_bytes: usize,

    /// Outbound request timeout in milliseconds.
    ///
    /// Set via HOMEPORT_FETCH_TIMEOUT_MS environment variable.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Background provider id (`bing`, `picsum`, `unsplash`).
    ///
    /// Set via HOMEPORT_BACKGROUND_PROVIDER environment variable.
    #[serde(default = "default_background_provider")]
    pub background_provider: String,

    /// Search query for query-parameterized providers.
    #[serde(default)]
    pub background_query: Option<String>,

    /// Seconds before a cached background is refreshed. `0` means manual
    /// refresh only.
    ///
    /// Set via HOMEPORT_BACKGROUND_INTERVAL_SECS environment variable.
    #[serde(default)]
    pub background_interval_secs: u64,

    /// Bundled image served when the provider is unavailable.
    #[serde(default)]
    pub default_background: Option<PathBuf>,

    /// Unsplash API access key, required only for the `unsplash` provider.
    ///
    /// Set via HOMEPORT_UNSPLASH_ACCESS_KEY environment variable.
    #[serde(default)]
    pub unsplash_access_key: Option<String>,

    /// Budget for detached warm-up resolutions, in milliseconds.
    #[serde(default = "default_warmup_timeout_ms")]
    pub warmup_timeout_ms: u64,

    /// Page URLs whose icons are resolved in the background at startup.
    ///
    /// Set via HOMEPORT_WARM_ICON_URLS environment variable using figment's
    /// array syntax (`[https://a.example,https://b.example]`).
    #[serde(default)]
    pub warm_icon_urls: Vec<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_user_agent() -> String {
    "homeport/0.1".into()
}

fn default_html_max_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_icon_max_bytes() -> usize {
    1024 * 1024
}

fn default_background_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_fetch_timeout_ms() -> u64 {
    15_000
}

fn default_max_redirects() -> usize {
    10
}

fn default_background_provider() -> String {
    "bing".into()
}

fn default_warmup_timeout_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_path: None,
            listen_addr: default_listen_addr(),
            user_agent: default_user_agent(),
            html_max_bytes: default_html_max_bytes(),
            icon_max_bytes: default_icon_max_bytes(),
            background_max_bytes: default_background_max_bytes(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            max_redirects: default_max_redirects(),
            background_provider: default_background_provider(),
            background_query: None,
            background_interval_secs: 0,
            default_background: None,
            unsplash_access_key: None,
            warmup_timeout_ms: default_warmup_timeout_ms(),
            warm_icon_urls: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Fetch timeout as Duration for use with reqwest/tokio.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Warm-up budget as Duration.
    pub fn warmup_timeout(&self) -> Duration {
        Duration::from_millis(self.warmup_timeout_ms)
    }

    /// Background refresh interval. Zero means manual refresh only.
    pub fn background_interval(&self) -> Duration {
        Duration::from_secs(self.background_interval_secs)
    }

    /// Directory holding resolved icons.
    pub fn icons_dir(&self) -> PathBuf {
        self.data_dir.join("icons")
    }

    /// Directory holding cached background images.
    pub fn backgrounds_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    /// Effective database path.
    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("homeport.sqlite"))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HOMEPORT_`
    /// 2. TOML file from `HOMEPORT_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HOMEPORT_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HOMEPORT_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let mut config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        // Comma-separated env values arrive as a single element.
        config.warm_icon_urls = config
            .warm_icon_urls
            .iter()
            .flat_map(|s| s.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        config.background_provider = config.background_provider.trim().to_ascii_lowercase();

        config.validate()?;

        Ok(config)
    }
}
