//! Background sync replay against the origin.

use std::sync::Arc;

use http::Method;
use rewind_client::Network;
use rewind_core::{Error, Request};
use rewind_worker::SyncReplay;
use url::Url;

/// Asks the origin to flush orders queued while the shopper was offline.
pub struct OrderReplay<N> {
    network: Arc<N>,
    endpoint: Url,
}

impl<N: Network> OrderReplay<N> {
    pub fn new(network: Arc<N>, endpoint: Url) -> Self {
        Self { network, endpoint }
    }
}

#[async_trait::async_trait]
impl<N: Network> SyncReplay for OrderReplay<N> {
    async fn replay(&self, tag: &str) -> Result<(), Error> {
        let request = Request::new(Method::POST, self.endpoint.clone());
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::SyncFailed { tag: tag.to_string(), reason: e.to_string() })?;

        if !response.is_success() {
            return Err(Error::SyncFailed { tag: tag.to_string(), reason: format!("status {}", response.status) });
        }
        tracing::info!(tag, endpoint = %self.endpoint, "order replay accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubNetwork, url};

    #[tokio::test]
    async fn test_replay_posts_to_endpoint() {
        let network = Arc::new(StubNetwork::storefront());
        let replay = OrderReplay::new(Arc::clone(&network), url("/api/orders/sync"));

        replay.replay("sync-orders").await.unwrap();
        assert_eq!(network.calls_to("/api/orders/sync"), 1);
    }

    #[tokio::test]
    async fn test_replay_fails_on_error_status() {
        let replay = OrderReplay::new(Arc::new(StubNetwork::storefront()), url("/api/missing"));
        let err = replay.replay("sync-orders").await.unwrap_err();
        assert!(matches!(err, Error::SyncFailed { ref reason, .. } if reason.contains("404")));
    }

    #[tokio::test]
    async fn test_replay_fails_offline() {
        let network = Arc::new(StubNetwork::storefront());
        network.set_online(false);
        let replay = OrderReplay::new(network, url("/api/orders/sync"));
        assert!(matches!(replay.replay("sync-orders").await, Err(Error::SyncFailed { .. })));
    }
}
