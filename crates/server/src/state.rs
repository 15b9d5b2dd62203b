//! Shared handler state.

use homeport_client::{
    AssetWriter, BackgroundService, BackgroundSettings, FetchLimits, Fetcher, IconLimits, IconService, Provider,
    ProviderResolver, spawn_background_warmup, spawn_icon_warmup,
};
use homeport_core::{AppConfig, CacheDb, Error};
use std::sync::Arc;

/// Services and configuration shared by all routes. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub icons: Arc<IconService>,
    pub backgrounds: Arc<BackgroundService>,
    /// Provider served by `GET /api/background/image`.
    pub provider: Provider,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Open the cache database and create the asset directories.
    pub async fn open(config: AppConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        if let Some(parent) = config.database_path().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let db = CacheDb::open(config.database_path()).await?;
        Self::with_db(config, db, fetcher).await
    }

    /// Build state around an existing database handle.
    pub async fn with_db(config: AppConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let timeout = config.fetch_timeout();
        let provider = Provider::parse(&config.background_provider, config.background_query.as_deref())?;

        let icon_writer = AssetWriter::new(config.icons_dir());
        icon_writer.ensure_dir().await?;
        let background_writer = AssetWriter::new(config.backgrounds_dir());
        background_writer.ensure_dir().await?;

        let icons = IconService::new(
            db.clone(),
            fetcher.clone(),
            icon_writer,
            IconLimits {
                html: FetchLimits::new(config.html_max_bytes, timeout),
                icon: FetchLimits::new(config.icon_max_bytes, timeout),
            },
        );

        let source = ProviderResolver::new(
            fetcher.clone(),
            FetchLimits::new(config.html_max_bytes, timeout),
            config.unsplash_access_key.clone(),
        );
        let backgrounds = BackgroundService::new(
            db,
            fetcher,
            Arc::new(source),
            background_writer,
            BackgroundSettings {
                limits: FetchLimits::new(config.background_max_bytes, timeout),
                interval: config.background_interval(),
                default_image: config.default_background.clone(),
            },
        );

        Ok(Self { icons: Arc::new(icons), backgrounds: Arc::new(backgrounds), provider, config: Arc::new(config) })
    }

    /// Start detached warm-up of the configured background and icon URLs.
    pub fn spawn_warmups(&self) {
        let budget = self.config.warmup_timeout();
        spawn_background_warmup(self.backgrounds.clone(), self.provider.clone(), budget);
        if !self.config.warm_icon_urls.is_empty() {
            spawn_icon_warmup(self.icons.clone(), self.config.warm_icon_urls.clone(), budget);
        }
    }
}
