//! HTTP surface of the host.
//!
//! `/__worker/*` exposes lifecycle state and background events; every other
//! path is a page request dispatched through the worker.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use rewind_client::Network;
use rewind_core::CacheStore;
use rewind_worker::ServiceWorker;
use url::Url;

use crate::routes::{admin, proxy};

/// Shared state handed to every handler.
pub struct AppState<S, N> {
    pub worker: Arc<ServiceWorker<S, N>>,
    /// Used for requests the worker does not intercept.
    pub network: Arc<N>,
    pub origin: Url,
    pub started_at: String,
}

impl<S, N> Clone for AppState<S, N> {
    fn clone(&self) -> Self {
        Self {
            worker: Arc::clone(&self.worker),
            network: Arc::clone(&self.network),
            origin: self.origin.clone(),
            started_at: self.started_at.clone(),
        }
    }
}

impl<S, N> AppState<S, N> {
    pub fn new(worker: Arc<ServiceWorker<S, N>>, network: Arc<N>, origin: Url) -> Self {
        Self { worker, network, origin, started_at: chrono::Utc::now().to_rfc3339() }
    }
}

pub fn router<S, N>(state: AppState<S, N>) -> Router
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    Router::new()
        .route("/__worker/status", get(admin::status::<S, N>))
        .route("/__worker/partitions", get(admin::partitions::<S, N>))
        .route("/__worker/push", post(admin::push::<S, N>))
        .route("/__worker/notifications/{id}/click", post(admin::click::<S, N>))
        .route("/__worker/notifications/{id}/close", post(admin::close::<S, N>))
        .route("/__worker/sync/{tag}", post(admin::register_sync::<S, N>))
        .route("/__worker/online", post(admin::online::<S, N>))
        .fallback(proxy::dispatch::<S, N>)
        .with_state(state)
}
