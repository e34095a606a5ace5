//! Push messages and notification clicks.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rewind_client::resolve_http;
use rewind_core::Error;
use rewind_core::config::NotificationConfig;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use super::clients::WindowClients;

/// Decoded push message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    /// Click target, possibly relative to the origin.
    pub url: String,
}

impl PushPayload {
    /// Decode a push message.
    ///
    /// A JSON object supplies `title`, `body` and `url` (or `data.url`); any
    /// other readable text becomes the body. Missing fields and unreadable
    /// payloads fall back to the configured defaults; decoding never fails.
    pub fn parse(data: Option<&[u8]>, defaults: &NotificationConfig) -> Self {
        let mut payload = Self {
            title: defaults.default_title.clone(),
            body: defaults.default_body.clone(),
            url: defaults.default_url.clone(),
        };
        let Some(data) = data else {
            return payload;
        };

        match serde_json::from_slice::<Value>(data) {
            Ok(Value::Object(fields)) => {
                if let Some(title) = text(fields.get("title")) {
                    payload.title = title.to_string();
                }
                if let Some(body) = text(fields.get("body")) {
                    payload.body = body.to_string();
                }
                let url = text(fields.get("url")).or_else(|| text(fields.get("data").and_then(|d| d.get("url"))));
                if let Some(url) = url {
                    payload.url = url.to_string();
                }
            }
            Ok(Value::String(body)) if !body.trim().is_empty() => payload.body = body.trim().to_string(),
            _ => match std::str::from_utf8(data) {
                Ok(text) if !text.trim().is_empty() => payload.body = text.trim().to_string(),
                Ok(_) => {}
                Err(_) => tracing::warn!(len = data.len(), "push payload is not text, showing generic notification"),
            },
        }
        payload
    }
}

/// Non-blank string field, trimmed.
fn text(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationData {
    pub url: String,
}

/// A displayed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
}

/// Platform surface that displays notifications.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;

    async fn close(&self, id: u64) -> Result<(), Error>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "client", rename_all = "snake_case")]
pub enum ClickAction {
    /// An existing window already showed the target and was focused.
    Focused(String),
    /// A new window was opened at the target.
    Opened(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickOutcome {
    pub notification: u64,
    pub url: Url,
    #[serde(flatten)]
    pub action: ClickAction,
}

/// Shows push notifications and routes clicks on them.
pub struct NotificationCenter {
    notifier: Arc<dyn Notifier>,
    clients: Arc<dyn WindowClients>,
    config: NotificationConfig,
    origin: Url,
    pending: Mutex<HashMap<u64, Notification>>,
    next_id: AtomicU64,
}

impl NotificationCenter {
    pub fn new(
        notifier: Arc<dyn Notifier>, clients: Arc<dyn WindowClients>, config: NotificationConfig, origin: Url,
    ) -> Self {
        Self { notifier, clients, config, origin, pending: Mutex::new(HashMap::new()), next_id: AtomicU64::new(1) }
    }

    /// Display exactly one notification for a push message.
    ///
    /// # Errors
    ///
    /// Only when the notifier fails; bad payloads show the generic notification.
    pub async fn show(&self, data: Option<&[u8]>) -> Result<Notification, Error> {
        let payload = PushPayload::parse(data, &self.config);
        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            title: payload.title,
            body: payload.body,
            icon: self.config.icon.clone(),
            badge: self.config.badge.clone(),
            vibrate: self.config.vibrate.clone(),
            data: NotificationData { url: payload.url },
        };

        self.notifier.show(&notification).await?;
        self.pending.lock().await.insert(notification.id, notification.clone());
        tracing::info!(id = notification.id, title = %notification.title, "notification shown");
        Ok(notification)
    }

    /// Close the notification and bring its target into view.
    ///
    /// Focuses a window already at the target URL, otherwise opens one.
    /// Returns `None` for ids that are not pending.
    pub async fn click(&self, id: u64) -> Result<Option<ClickOutcome>, Error> {
        let Some(notification) = self.pending.lock().await.remove(&id) else {
            tracing::debug!(id, "click on unknown notification");
            return Ok(None);
        };
        if let Err(err) = self.notifier.close(id).await {
            tracing::warn!(id, error = %err, "failed to close notification");
        }

        let url = self.target(&notification.data.url)?;
        let action = match self.clients.find(&url).await {
            Some(client) => {
                self.clients.focus(&client).await?;
                ClickAction::Focused(client)
            }
            None => ClickAction::Opened(self.clients.open(&url).await?),
        };
        tracing::info!(id, %url, ?action, "notification clicked");
        Ok(Some(ClickOutcome { notification: id, url, action }))
    }

    /// Close a notification without navigating. Returns whether it was pending.
    pub async fn dismiss(&self, id: u64) -> bool {
        let removed = self.pending.lock().await.remove(&id).is_some();
        if removed && let Err(err) = self.notifier.close(id).await {
            tracing::warn!(id, error = %err, "failed to close notification");
        }
        removed
    }

    /// Pending notifications, oldest first.
    pub async fn pending(&self) -> Vec<Notification> {
        let mut pending: Vec<Notification> = self.pending.lock().await.values().cloned().collect();
        pending.sort_by_key(|n| n.id);
        pending
    }

    fn target(&self, url: &str) -> Result<Url, Error> {
        resolve_http(&self.origin, url)
            .or_else(|_| resolve_http(&self.origin, &self.config.default_url))
            .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))
    }
}
