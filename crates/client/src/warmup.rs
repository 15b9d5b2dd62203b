//! Detached cache warm-up.
//!
//! Each task runs under its own time budget, independent of any request.
//! Failures and timeouts are logged and dropped.

use crate::background::{BackgroundService, Provider};
use crate::icon::IconService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Populate the background cache for `provider` if it is missing or stale.
pub fn spawn_background_warmup(service: Arc<BackgroundService>, provider: Provider, budget: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::time::timeout(budget, service.image(&provider)).await {
            Ok(Ok(image)) => tracing::info!(%provider, origin = ?image.origin, "background warm-up done"),
            Ok(Err(e)) => tracing::warn!(%provider, error = %e, "background warm-up failed"),
            Err(_) => tracing::warn!(%provider, budget_ms = budget.as_millis() as u64, "background warm-up timed out"),
        }
    })
}

/// Resolve each URL's icon in its own task.
pub fn spawn_icon_warmup(service: Arc<IconService>, urls: Vec<String>, budget: Duration) -> Vec<JoinHandle<()>> {
    urls.into_iter()
        .map(|url| {
            let service = service.clone();
            tokio::spawn(async move {
                match tokio::time::timeout(budget, service.resolve(&url, false)).await {
                    Ok(Ok(lookup)) => tracing::debug!(%url, cached = lookup.cached, "icon warm-up done"),
                    Ok(Err(e)) => tracing::warn!(%url, error = %e, "icon warm-up failed"),
                    Err(_) => tracing::warn!(%url, "icon warm-up timed out"),
                }
            })
        })
        .collect()
}
