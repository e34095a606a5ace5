//! The worker as the host sees it: one method per platform event.

use std::sync::Arc;

use rewind_client::Network;
use rewind_core::config::NotificationConfig;
use rewind_core::{AppConfig, CacheStore, Error, PartitionNames, Request};
use tokio::sync::watch;

use crate::background::{
    ClickOutcome, Notification, NotificationCenter, Notifier, SyncManager, SyncOutcome, SyncReplay, WindowClients,
};
use crate::lifecycle::{ActivateReport, InstallReport, Lifecycle, WorkerState};
use crate::manifest::{OfflineFallback, StaticManifest};
use crate::route::{BypassReason, RouteScope};
use crate::router::{FetchOutcome, FetchRouter};

/// Everything fixed for one deployed version.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub scope: RouteScope,
    pub names: PartitionNames,
    pub offline: OfflineFallback,
    pub notification: NotificationConfig,
    pub sync_max_attempts: u32,
}

impl WorkerSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            scope: RouteScope::new(origin, &config.api_prefix, StaticManifest::new(config.static_assets.iter().cloned())),
            names: config.partition_names(),
            offline: OfflineFallback::new(&config.offline_page, &config.offline_stylesheet),
            notification: config.notification.clone(),
            sync_max_attempts: config.sync.max_attempts,
        })
    }
}

pub struct ServiceWorker<S, N> {
    settings: Arc<WorkerSettings>,
    store: Arc<S>,
    lifecycle: Lifecycle<S, N>,
    router: FetchRouter<S, N>,
    sync: SyncManager,
    notifications: NotificationCenter,
}

impl<S, N> ServiceWorker<S, N>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    pub fn new(
        settings: WorkerSettings, store: Arc<S>, network: Arc<N>, notifier: Arc<dyn Notifier>,
        clients: Arc<dyn WindowClients>,
    ) -> Self {
        let settings = Arc::new(settings);
        let lifecycle = Lifecycle::new(Arc::clone(&store), Arc::clone(&network), Arc::clone(&settings));
        let router = FetchRouter::new(Arc::clone(&store), network, Arc::clone(&settings));
        let sync = SyncManager::new(settings.sync_max_attempts);
        let notifications = NotificationCenter::new(
            notifier,
            clients,
            settings.notification.clone(),
            settings.scope.origin.clone(),
        );
        Self { settings, store, lifecycle, router, sync, notifications }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.lifecycle.subscribe()
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.activate().await
    }

    /// Handle a fetch event. Until activation completes the page is not
    /// controlled and every request bypasses the worker.
    pub async fn handle_fetch(&self, request: &Request) -> FetchOutcome {
        if self.state() != WorkerState::Activated {
            return FetchOutcome::Bypass(BypassReason::NotControlled);
        }
        self.router.handle(request).await
    }

    pub async fn set_sync_replay(&self, tag: impl Into<String>, replay: Arc<dyn SyncReplay>) {
        self.sync.set_replay(tag, replay).await;
    }

    pub async fn register_sync(&self, tag: &str) -> Result<(), Error> {
        self.sync.register(tag).await
    }

    pub async fn pending_syncs(&self) -> Vec<String> {
        self.sync.pending().await
    }

    pub async fn handle_sync(&self, tag: &str) -> SyncOutcome {
        self.sync.on_sync(tag).await
    }

    pub async fn connectivity_restored(&self) -> Vec<(String, SyncOutcome)> {
        self.sync.connectivity_restored().await
    }

    pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<Notification, Error> {
        self.notifications.show(data).await
    }

    pub async fn handle_notification_click(&self, id: u64) -> Result<Option<ClickOutcome>, Error> {
        self.notifications.click(id).await
    }

    pub async fn handle_notification_close(&self, id: u64) -> bool {
        self.notifications.dismiss(id).await
    }

    pub async fn pending_notifications(&self) -> Vec<Notification> {
        self.notifications.pending().await
    }
}
