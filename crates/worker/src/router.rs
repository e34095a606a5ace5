//! Fetch interception.
//!
//! [`FetchRouter::handle`] classifies a request and runs one of three
//! strategies against the store and the network:
//!
//! - API data: network first, any cached copy or an offline JSON error on failure
//! - Shell assets: static partition first, network on miss
//! - Everything else: network first, exact cached copy, then the offline page
//!   for navigations or a plain-text error
//!
//! Successful (2xx) network responses are tee'd: one copy goes back to the
//! caller, the other is written to the strategy's partition. Write failures,
//! quota included, are logged and never change the response.

use std::sync::Arc;

use http::StatusCode;
use rewind_client::Network;
use rewind_core::{CacheStore, Request, RequestKey, ResponseSnapshot};

use crate::route::{BypassReason, Route, Strategy, classify};
use crate::worker::WorkerSettings;

/// Error message of the synthesized offline API response.
pub const OFFLINE_API_MESSAGE: &str = "You are offline. Please check your connection.";

/// Body of the plain-text offline response.
pub const OFFLINE_TEXT: &str = "You are offline.";

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    /// Synthesized, or the seeded offline page.
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Offline => "offline",
        }
    }
}

/// Result of handling one fetch event.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the platform performs the request itself.
    Bypass(BypassReason),
    Respond { response: ResponseSnapshot, source: ResponseSource },
}

impl FetchOutcome {
    fn respond(response: ResponseSnapshot, source: ResponseSource) -> Self {
        Self::Respond { response, source }
    }

    pub fn response(&self) -> Option<&ResponseSnapshot> {
        match self {
            Self::Respond { response, .. } => Some(response),
            Self::Bypass(_) => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Self::Respond { source, .. } => Some(*source),
            Self::Bypass(_) => None,
        }
    }
}

/// `503` JSON returned for API requests with no network and no cached copy.
pub fn offline_api_response() -> ResponseSnapshot {
    ResponseSnapshot::json(StatusCode::SERVICE_UNAVAILABLE, &serde_json::json!({ "error": OFFLINE_API_MESSAGE }))
}

/// `503` plain text returned when nothing better is available.
pub fn offline_text_response() -> ResponseSnapshot {
    ResponseSnapshot::text(StatusCode::SERVICE_UNAVAILABLE, OFFLINE_TEXT)
}

pub struct FetchRouter<S, N> {
    store: Arc<S>,
    network: Arc<N>,
    settings: Arc<WorkerSettings>,
}

impl<S, N> FetchRouter<S, N>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    pub fn new(store: Arc<S>, network: Arc<N>, settings: Arc<WorkerSettings>) -> Self {
        Self { store, network, settings }
    }

    /// Classify and handle a request.
    pub async fn handle(&self, request: &Request) -> FetchOutcome {
        let strategy = match classify(request, &self.settings.scope) {
            Route::Bypass(reason) => {
                tracing::trace!(url = %request.url, %reason, "bypass");
                return FetchOutcome::Bypass(reason);
            }
            Route::Handle(strategy) => strategy,
        };

        let outcome = match strategy {
            Strategy::NetworkFirstApi => self.network_first_api(request).await,
            Strategy::CacheFirstStatic => self.cache_first_static(request).await,
            Strategy::NetworkFirstGeneric => self.network_first_generic(request).await,
        };

        if let FetchOutcome::Respond { response, source } = &outcome {
            tracing::debug!(
                url = %request.url,
                ?strategy,
                source = source.as_str(),
                status = response.status.as_u16(),
                "fetch handled"
            );
        }
        outcome
    }

    async fn network_first_api(&self, request: &Request) -> FetchOutcome {
        let key = request.key();
        match self.network.fetch(request).await {
            Ok(response) => {
                let response = self.keep(self.settings.names.dynamic_name(), key, response).await;
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "api fetch failed");
                match self.lookup(&key, None).await {
                    Some(cached) => FetchOutcome::respond(cached, ResponseSource::Cache),
                    None => FetchOutcome::respond(offline_api_response(), ResponseSource::Offline),
                }
            }
        }
    }

    async fn cache_first_static(&self, request: &Request) -> FetchOutcome {
        let key = request.key();
        let static_name = self.settings.names.static_name();
        if let Some(hit) = self.lookup(&key, Some(&static_name)).await {
            return FetchOutcome::respond(hit, ResponseSource::Cache);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                let response = self.keep(static_name, key, response).await;
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "static fetch failed");
                self.recover(request, &key).await
            }
        }
    }

    async fn network_first_generic(&self, request: &Request) -> FetchOutcome {
        let key = request.key();
        match self.network.fetch(request).await {
            Ok(response) => {
                let response = self.keep(self.settings.names.dynamic_name(), key, response).await;
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "fetch failed");
                self.recover(request, &key).await
            }
        }
    }

    /// Offline path shared by the static and generic strategies.
    async fn recover(&self, request: &Request, key: &RequestKey) -> FetchOutcome {
        if let Some(cached) = self.lookup(key, None).await {
            return FetchOutcome::respond(cached, ResponseSource::Cache);
        }
        if request.accepts_html()
            && let Some(page) = self.offline_page().await
        {
            return FetchOutcome::respond(page, ResponseSource::Offline);
        }
        FetchOutcome::respond(offline_text_response(), ResponseSource::Offline)
    }

    async fn offline_page(&self) -> Option<ResponseSnapshot> {
        let url = self.settings.offline.page_url(&self.settings.scope.origin).ok()?;
        let page = self.lookup(&RequestKey::get(&url), Some(&self.settings.names.dynamic_name())).await;
        if page.is_none() {
            tracing::warn!(%url, "offline page missing from cache");
        }
        page
    }

    /// Cache lookup where storage errors count as a miss.
    async fn lookup(&self, key: &RequestKey, partition: Option<&str>) -> Option<ResponseSnapshot> {
        let result = match partition {
            Some(name) => match self.store.find(name).await {
                Ok(Some(partition)) => self.store.match_request(key, Some(&partition)).await,
                Ok(None) => Ok(None),
                Err(err) => Err(err),
            },
            None => self.store.match_request(key, None).await,
        };
        result.unwrap_or_else(|err| {
            tracing::warn!(%key, error = %err, "cache lookup failed");
            None
        })
    }

    /// Store a copy of a 2xx response and return the other copy.
    ///
    /// The write runs as its own task so a dropped caller cannot abort it
    /// halfway; it is still awaited before returning.
    async fn keep(&self, partition: String, key: RequestKey, response: ResponseSnapshot) -> ResponseSnapshot {
        if !response.is_success() {
            return response;
        }

        let (returned, stored) = response.tee();
        let store = Arc::clone(&self.store);
        let label = key.to_string();
        let write = tokio::spawn(async move {
            let partition = store.open(&partition).await?;
            store.put(&partition, &key, &stored).await
        });

        match write.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::warn!(key = %label, error = %err, "cache write skipped"),
            Err(err) => tracing::warn!(key = %label, error = %err, "cache write task failed"),
        }
        returned
    }
}
