//! Window clients controlled by the worker.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use rewind_core::Error;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

/// Open windows the worker can focus or navigate.
#[async_trait::async_trait]
pub trait WindowClients: Send + Sync {
    /// Id of a window currently showing exactly `url`.
    async fn find(&self, url: &Url) -> Option<String>;

    async fn focus(&self, id: &str) -> Result<(), Error>;

    /// Open a new window at `url` and return its id.
    async fn open(&self, url: &Url) -> Result<String, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowClient {
    pub id: String,
    pub url: Url,
    pub focused: bool,
}

/// In-process window list.
#[derive(Default)]
pub struct ClientRegistry {
    windows: RwLock<BTreeMap<String, WindowClient>>,
    next_id: AtomicU64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a window that is already open.
    pub async fn attach(&self, url: Url) -> String {
        let id = format!("client-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let client = WindowClient { id: id.clone(), url, focused: false };
        self.windows.write().await.insert(id.clone(), client);
        id
    }

    pub async fn detach(&self, id: &str) -> bool {
        self.windows.write().await.remove(id).is_some()
    }

    pub async fn list(&self) -> Vec<WindowClient> {
        self.windows.read().await.values().cloned().collect()
    }

    pub async fn focused(&self) -> Option<WindowClient> {
        self.windows.read().await.values().find(|c| c.focused).cloned()
    }
}

#[async_trait::async_trait]
impl WindowClients for ClientRegistry {
    async fn find(&self, url: &Url) -> Option<String> {
        self.windows.read().await.values().find(|c| &c.url == url).map(|c| c.id.clone())
    }

    async fn focus(&self, id: &str) -> Result<(), Error> {
        let mut windows = self.windows.write().await;
        if !windows.contains_key(id) {
            return Err(Error::Notification(format!("no window client {id}")));
        }
        for (client_id, client) in windows.iter_mut() {
            client.focused = client_id == id;
        }
        Ok(())
    }

    async fn open(&self, url: &Url) -> Result<String, Error> {
        let id = self.attach(url.clone()).await;
        self.focus(&id).await?;
        Ok(id)
    }
}
