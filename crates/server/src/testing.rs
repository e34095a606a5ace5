//! Fakes for the HTTP tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use rewind_client::Network;
use rewind_core::{AppConfig, Error, MemoryStore, Request, ResponseSnapshot};
use rewind_worker::{ClientRegistry, ServiceWorker, WorkerSettings};
use url::Url;

use crate::handler::AppState;
use crate::notifier::LogNotifier;

pub(crate) const ORIGIN: &str = "https://shop.test";

pub(crate) struct StubNetwork {
    routes: HashMap<String, ResponseSnapshot>,
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<String>>,
    online: AtomicBool,
}

impl StubNetwork {
    pub(crate) fn storefront() -> Self {
        let mut routes = HashMap::new();
        let mut serve = |path: &str, response: ResponseSnapshot| {
            routes.insert(url(path).to_string(), response);
        };
        serve("/", ResponseSnapshot::ok("text/html", "<html>home</html>"));
        serve("/index.html", ResponseSnapshot::ok("text/html", "<html>index</html>"));
        serve("/offline.html", ResponseSnapshot::ok("text/html", "<h1>offline</h1>"));
        serve("/offline.css", ResponseSnapshot::ok("text/css", "h1{}"));
        serve("/api/orders", ResponseSnapshot::json(StatusCode::CREATED, &serde_json::json!({ "ok": true })));
        serve("/api/orders/sync", ResponseSnapshot::json(StatusCode::OK, &serde_json::json!({ "flushed": 2 })));
        Self {
            routes,
            calls: Mutex::new(Vec::new()),
            bodies: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        let target = url(path).to_string();
        self.calls.lock().unwrap().iter().filter(|u| **u == target).count()
    }

    pub(crate) fn last_body(&self) -> Option<String> {
        self.bodies.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("connection refused".into()));
        }
        self.calls.lock().unwrap().push(request.url.to_string());
        self.bodies.lock().unwrap().push(String::from_utf8_lossy(&request.body).into_owned());
        Ok(self
            .routes
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| ResponseSnapshot::text(StatusCode::NOT_FOUND, "not found")))
    }
}

pub(crate) fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub(crate) fn config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), static_assets: vec!["/".into(), "/index.html".into()], ..Default::default() }
}

/// Installed and activated worker over an in-memory store.
pub(crate) async fn app_state() -> (AppState<MemoryStore, StubNetwork>, Arc<StubNetwork>) {
    let network = Arc::new(StubNetwork::storefront());
    let settings = WorkerSettings::from_config(&config()).unwrap();
    let worker = ServiceWorker::new(
        settings,
        Arc::new(MemoryStore::new()),
        Arc::clone(&network),
        Arc::new(LogNotifier),
        Arc::new(ClientRegistry::new()),
    );
    worker.install().await.unwrap();
    worker.activate().await.unwrap();

    let state = AppState::new(Arc::new(worker), Arc::clone(&network), Url::parse(ORIGIN).unwrap());
    (state, network)
}
