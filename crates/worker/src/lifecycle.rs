//! Install and activate.
//!
//! The worker moves through a fixed sequence of states, driven by the host:
//!
//! ```text
//! Parsed -> Installing -> Installed -> Activating -> Activated
//!               |
//!               +-> Redundant
//! ```
//!
//! Install populates the current version's partitions all-or-nothing.
//! Activate deletes every partition left behind by other versions.

use std::fmt;
use std::sync::Arc;

use futures_util::future::try_join_all;
use rewind_client::Network;
use rewind_core::{CacheStore, Error, Partition, Request, RequestKey, ResponseSnapshot};
use serde::Serialize;
use tokio::sync::watch;
use url::Url;

use crate::worker::WorkerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Activated,
    /// Install failed; this version never activates.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub static_partition: String,
    pub dynamic_partition: String,
    /// Manifest assets written to the static partition.
    pub static_entries: usize,
    /// Offline assets written to the dynamic partition.
    pub seeded_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub retained: Vec<String>,
}

pub struct Lifecycle<S, N> {
    store: Arc<S>,
    network: Arc<N>,
    settings: Arc<WorkerSettings>,
    state: watch::Sender<WorkerState>,
}

impl<S, N> Lifecycle<S, N>
where
    S: CacheStore,
    N: Network,
{
    pub fn new(store: Arc<S>, network: Arc<N>, settings: Arc<WorkerSettings>) -> Self {
        let (state, _) = watch::channel(WorkerState::Parsed);
        Self { store, network, settings, state }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Populate the static partition from the manifest and seed the offline pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the worker is `Parsed`, and
    /// [`Error::InstallFailed`] when any asset cannot be fetched or stored;
    /// the worker is then `Redundant`.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Parsed, WorkerState::Installing)?;
        tracing::info!(version = self.settings.names.version(), "installing");

        match self.populate().await {
            Ok(report) => {
                self.state.send_replace(WorkerState::Installed);
                tracing::info!(
                    static_entries = report.static_entries,
                    seeded_entries = report.seeded_entries,
                    "installed"
                );
                Ok(report)
            }
            Err(err) => {
                self.state.send_replace(WorkerState::Redundant);
                tracing::error!(error = %err, "install failed, worker is redundant");
                Err(err)
            }
        }
    }

    /// Delete every partition owned by another version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the worker is `Installed`. A
    /// storage error returns the worker to `Installed`.
    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating)?;

        match self.evict_stale().await {
            Ok(report) => {
                self.state.send_replace(WorkerState::Activated);
                tracing::info!(deleted = ?report.deleted, "activated");
                Ok(report)
            }
            Err(err) => {
                self.state.send_replace(WorkerState::Installed);
                tracing::error!(error = %err, "activation failed");
                Err(err)
            }
        }
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut current = from;
        let moved = self.state.send_if_modified(|state| {
            current = *state;
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if moved { Ok(()) } else { Err(Error::InvalidState(format!("cannot move to {to} from {current}"))) }
    }

    async fn populate(&self) -> Result<InstallReport, Error> {
        let origin = &self.settings.scope.origin;
        let names = &self.settings.names;

        let statics = self.store.open(&names.static_name()).await?;
        let static_entries = self.add_all(&statics, &self.settings.scope.manifest.urls(origin)?).await?;

        let dynamic = self.store.open(&names.dynamic_name()).await?;
        let seeded_entries = self.add_all(&dynamic, &self.settings.offline.urls(origin)?).await?;

        Ok(InstallReport {
            static_partition: statics.name().to_string(),
            dynamic_partition: dynamic.name().to_string(),
            static_entries,
            seeded_entries,
        })
    }

    /// Fetch every URL, then store them all. Nothing is written unless every
    /// fetch returned 2xx.
    async fn add_all(&self, partition: &Partition, urls: &[Url]) -> Result<usize, Error> {
        let fetches = urls.iter().map(|url| self.fetch_asset(url));
        let fetched = try_join_all(fetches).await?;

        for (key, response) in &fetched {
            self.store
                .put(partition, key, response)
                .await
                .map_err(|e| Error::InstallFailed { url: key.url().to_string(), reason: e.to_string() })?;
        }
        Ok(fetched.len())
    }

    async fn fetch_asset(&self, url: &Url) -> Result<(RequestKey, ResponseSnapshot), Error> {
        let request = Request::get(url.clone());
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.is_success() {
            return Err(Error::InstallFailed { url: url.to_string(), reason: format!("status {}", response.status) });
        }
        Ok((request.key(), response))
    }

    async fn evict_stale(&self) -> Result<ActivateReport, Error> {
        let names = &self.settings.names;
        let mut deleted = Vec::new();
        let mut retained = Vec::new();

        for name in self.store.partition_names().await? {
            if names.is_stale(&name) {
                self.store.delete_partition(&name).await?;
                tracing::info!(partition = %name, "deleted stale partition");
                deleted.push(name);
            } else {
                retained.push(name);
            }
        }
        Ok(ActivateReport { deleted, retained })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockNetwork, OFFLINE_HTML, settings, settings_with, url};
    use http::StatusCode;
    use rewind_core::{CacheDb, MemoryStore, PartitionNames};

    fn lifecycle<S: CacheStore>(
        store: Arc<S>, network: Arc<MockNetwork>, settings: WorkerSettings,
    ) -> Lifecycle<S, MockNetwork> {
        Lifecycle::new(store, network, Arc::new(settings))
    }

    async fn cached(store: &impl CacheStore, partition: &str, path: &str) -> Option<ResponseSnapshot> {
        let partition = store.open(partition).await.unwrap();
        store.match_request(&RequestKey::get(&url(path)), Some(&partition)).await.unwrap()
    }

    #[tokio::test]
    async fn test_install_populates_both_partitions() {
        let store = Arc::new(MemoryStore::new());
        let lc = lifecycle(Arc::clone(&store), Arc::new(MockNetwork::storefront()), settings("v1"));

        let report = lc.install().await.unwrap();
        assert_eq!(lc.state(), WorkerState::Installed);
        assert_eq!(report.static_partition, "rewind-static-v1");
        assert_eq!(report.static_entries, 3);
        assert_eq!(report.seeded_entries, 2);

        for path in ["/", "/index.html", "/manifest.json"] {
            assert!(cached(store.as_ref(), "rewind-static-v1", path).await.is_some(), "{path}");
        }
        let page = cached(store.as_ref(), "rewind-dynamic-v1", "/offline.html").await.unwrap();
        assert_eq!(&page.body[..], OFFLINE_HTML.as_bytes());
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let store = Arc::new(MemoryStore::new());
        let network = Arc::new(MockNetwork::storefront());
        network.serve("/manifest.json", ResponseSnapshot::text(StatusCode::NOT_FOUND, "missing"));
        let lc = lifecycle(Arc::clone(&store), network, settings("v1"));

        let err = lc.install().await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed { ref url, .. } if url.ends_with("/manifest.json")));
        assert_eq!(lc.state(), WorkerState::Redundant);

        let statics = store.open("rewind-static-v1").await.unwrap();
        assert_eq!(store.entry_count(&statics).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_offline_makes_worker_redundant() {
        let network = Arc::new(MockNetwork::storefront());
        network.set_online(false);
        let lc = lifecycle(Arc::new(MemoryStore::new()), network, settings("v1"));

        assert!(lc.install().await.is_err());
        assert_eq!(lc.state(), WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_redundant_worker_cannot_activate() {
        let network = Arc::new(MockNetwork::storefront());
        network.set_online(false);
        let lc = lifecycle(Arc::new(MemoryStore::new()), network, settings("v1"));
        let _ = lc.install().await;

        assert!(matches!(lc.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(lc.state(), WorkerState::Redundant);
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let lc = lifecycle(Arc::new(MemoryStore::new()), Arc::new(MockNetwork::storefront()), settings("v1"));
        lc.install().await.unwrap();

        assert!(matches!(lc.install().await, Err(Error::InvalidState(_))));
        assert_eq!(lc.state(), WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_activate_before_install_is_rejected() {
        let lc = lifecycle(Arc::new(MemoryStore::new()), Arc::new(MockNetwork::storefront()), settings("v1"));
        assert!(matches!(lc.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(lc.state(), WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_activate_deletes_only_stale_owned_partitions() {
        let store = Arc::new(MemoryStore::new());
        for name in ["rewind-static-v1", "rewind-dynamic-v1", "analytics-queue"] {
            store.open(name).await.unwrap();
        }
        let lc = lifecycle(Arc::clone(&store), Arc::new(MockNetwork::storefront()), settings("v2"));
        lc.install().await.unwrap();

        let report = lc.activate().await.unwrap();
        assert_eq!(lc.state(), WorkerState::Activated);
        assert_eq!(report.deleted, vec!["rewind-static-v1".to_string(), "rewind-dynamic-v1".to_string()]);

        let remaining = store.partition_names().await.unwrap();
        assert_eq!(remaining, vec!["analytics-queue", "rewind-static-v2", "rewind-dynamic-v2"]);
        assert_eq!(report.retained, remaining);
    }

    #[tokio::test]
    async fn test_version_bump_scenario_on_sqlite() {
        let store = Arc::new(CacheDb::open_in_memory().await.unwrap());
        store.open("app-static-v1").await.unwrap();

        let mut settings = settings_with("v2", ["/", "/index.html"]);
        settings.names = PartitionNames::new("app", "v2");
        let lc = lifecycle(Arc::clone(&store), Arc::new(MockNetwork::storefront()), settings);

        lc.install().await.unwrap();
        assert!(cached(store.as_ref(), "app-static-v2", "/").await.is_some());
        assert!(cached(store.as_ref(), "app-static-v2", "/index.html").await.is_some());

        let report = lc.activate().await.unwrap();
        assert_eq!(report.deleted, vec!["app-static-v1".to_string()]);

        let names = store.partition_names().await.unwrap();
        assert!(!names.contains(&"app-static-v1".to_string()));
        assert!(names.contains(&"app-static-v2".to_string()));
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let lc = lifecycle(Arc::new(MemoryStore::new()), Arc::new(MockNetwork::storefront()), settings("v1"));
        let mut rx = lc.subscribe();

        lc.install().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), WorkerState::Installed);

        lc.activate().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), WorkerState::Activated);
    }
}
