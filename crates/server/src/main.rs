//! rewind-sw entry point.
//!
//! Boots the offline layer in front of the storefront origin: installs and
//! activates the worker, then serves page requests through it over HTTP.
//! Logs are JSON on stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use rewind_client::{FetchClient, FetchConfig};
use rewind_core::{AppConfig, CacheDb};
use rewind_worker::{ClientRegistry, ServiceWorker, WorkerSettings};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod notifier;
mod replay;
mod routes;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let settings = WorkerSettings::from_config(&config)?;
    let origin = settings.scope.origin.clone();

    let store = Arc::new(CacheDb::open(&config.db_path).await?.with_quota(config.quota_bytes));
    let network = Arc::new(FetchClient::new(FetchConfig::from_app(&config))?);

    let worker = ServiceWorker::new(
        settings,
        store,
        Arc::clone(&network),
        Arc::new(notifier::LogNotifier),
        Arc::new(ClientRegistry::new()),
    );

    let endpoint = origin
        .join(&config.sync.order_endpoint)
        .with_context(|| format!("invalid sync endpoint {}", config.sync.order_endpoint))?;
    let replay = replay::OrderReplay::new(Arc::clone(&network), endpoint);
    worker.set_sync_replay(&config.sync.order_tag, Arc::new(replay)).await;

    worker.install().await.context("install failed")?;
    worker.activate().await.context("activation failed")?;

    let state = handler::AppState::new(Arc::new(worker), network, origin.clone());
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!(addr = %config.listen_addr, %origin, version = %config.cache_version, "serving rewind-sw");

    axum::serve(listener, handler::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
