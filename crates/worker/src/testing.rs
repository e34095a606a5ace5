//! Scripted network and settings shared by the worker tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use http::StatusCode;
use rewind_client::Network;
use rewind_core::config::NotificationConfig;
use rewind_core::{Error, PartitionNames, Request, ResponseSnapshot};
use url::Url;

use crate::manifest::{OfflineFallback, StaticManifest};
use crate::route::RouteScope;
use crate::worker::WorkerSettings;

pub(crate) const ORIGIN: &str = "https://shop.test";

pub(crate) const OFFLINE_HTML: &str = "<html><body><h1>You are offline</h1></body></html>";

/// Network that serves canned responses and can be switched off.
pub(crate) struct MockNetwork {
    routes: Mutex<HashMap<String, ResponseSnapshot>>,
    calls: Mutex<Vec<String>>,
    online: AtomicBool,
}

impl MockNetwork {
    pub(crate) fn new() -> Self {
        Self { routes: Mutex::new(HashMap::new()), calls: Mutex::new(Vec::new()), online: AtomicBool::new(true) }
    }

    /// Network serving the default shell, offline pair and a product API.
    pub(crate) fn storefront() -> Self {
        let net = Self::new();
        for path in ["/", "/index.html"] {
            net.serve(path, ResponseSnapshot::ok("text/html", format!("<html>{path}</html>")));
        }
        net.serve("/manifest.json", ResponseSnapshot::ok("application/manifest+json", "{}"));
        net.serve("/offline.html", ResponseSnapshot::ok("text/html", OFFLINE_HTML));
        net.serve("/offline.css", ResponseSnapshot::ok("text/css", "h1 { color: #8b5e3c }"));
        net.serve("/api/products", ResponseSnapshot::ok("application/json", r#"[{"id":1,"name":"Denim jacket"}]"#));
        net
    }

    pub(crate) fn serve(&self, path: &str, response: ResponseSnapshot) {
        self.routes.lock().unwrap().insert(url(path).to_string(), response);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of fetches that reached the network for `path`.
    pub(crate) fn calls_to(&self, path: &str) -> usize {
        let target = url(path).to_string();
        self.calls.lock().unwrap().iter().filter(|u| **u == target).count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        self.calls.lock().unwrap().push(request.url.to_string());
        let response = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        Ok(response.unwrap_or_else(|| ResponseSnapshot::text(StatusCode::NOT_FOUND, "not found")))
    }
}

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn settings(version: &str) -> WorkerSettings {
    settings_with(version, ["/", "/index.html", "/manifest.json"])
}

pub(crate) fn settings_with<const N: usize>(version: &str, manifest: [&str; N]) -> WorkerSettings {
    WorkerSettings {
        scope: RouteScope::new(Url::parse(ORIGIN).unwrap(), "/api/", StaticManifest::new(manifest)),
        names: PartitionNames::new("rewind", version),
        offline: OfflineFallback::new("/offline.html", "/offline.css"),
        notification: NotificationConfig::default(),
        sync_max_attempts: 3,
    }
}
