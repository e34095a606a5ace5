//! Notification display for a headless host: notifications are logged.

use rewind_core::Error;
use rewind_worker::{Notification, Notifier};

pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(
            id = notification.id,
            title = %notification.title,
            body = %notification.body,
            url = %notification.data.url,
            "show notification"
        );
        Ok(())
    }

    async fn close(&self, id: u64) -> Result<(), Error> {
        tracing::info!(id, "close notification");
        Ok(())
    }
}
