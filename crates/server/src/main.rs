//! homeport server entry point.
//!
//! Loads configuration, opens the cache database, starts warm-up, and serves
//! the HTTP API. Logs are JSON on stderr.

use anyhow::{Context, Result};
use homeport_client::{FetchClient, FetchConfig};
use homeport_core::AppConfig;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod error;
mod routes;
mod state;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let fetcher = FetchClient::new(&FetchConfig {
        user_agent: config.user_agent.clone(),
        max_redirects: config.max_redirects,
    })?;

    let state = state::AppState::open(config.clone(), Arc::new(fetcher))
        .await
        .with_context(|| format!("failed to open cache at {}", config.database_path().display()))?;
    state.spawn_warmups();

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, data_dir = %config.data_dir.display(), "homeport listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("homeport stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
