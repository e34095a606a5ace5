//! Offline behaviour of the storefront: lifecycle, fetch interception and
//! background delivery.
//!
//! [`ServiceWorker`] is the entry point. It is generic over the cache store
//! and the network so the same code runs against SQLite and reqwest in the
//! host and against in-memory fakes in tests.

pub mod background;
pub mod lifecycle;
pub mod manifest;
pub mod route;
pub mod router;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use background::{
    ClickAction, ClickOutcome, ClientRegistry, Notification, NotificationCenter, Notifier, PushPayload, SyncManager,
    SyncOutcome, SyncReplay, WindowClients,
};
pub use lifecycle::{ActivateReport, InstallReport, Lifecycle, WorkerState};
pub use manifest::{OfflineFallback, StaticManifest};
pub use route::{BypassReason, Route, RouteScope, Strategy, classify};
pub use router::{FetchOutcome, FetchRouter, OFFLINE_API_MESSAGE, OFFLINE_TEXT, ResponseSource};
pub use worker::{ServiceWorker, WorkerSettings};
