//! Events that arrive with no page request attached: deferred sync, push
//! messages and notification clicks.

pub mod clients;
pub mod push;
pub mod sync;

pub use clients::{ClientRegistry, WindowClient, WindowClients};
pub use push::{ClickAction, ClickOutcome, Notification, NotificationCenter, NotificationData, Notifier, PushPayload};
pub use sync::{SyncManager, SyncOutcome, SyncReplay};
