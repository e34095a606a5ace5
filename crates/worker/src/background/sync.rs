//! Deferred work replayed when connectivity returns.

use std::collections::HashMap;
use std::sync::Arc;

use rewind_core::Error;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

/// Replays the work deferred under one sync tag.
#[async_trait::async_trait]
pub trait SyncReplay: Send + Sync {
    async fn replay(&self, tag: &str) -> Result<(), Error>;
}

/// What a sync signal did to a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Replay succeeded; the registration is gone.
    Replayed,
    /// Replay failed and will run again on the next signal.
    Retrying { attempts: u32 },
    /// Replay failed too often; the registration was dropped.
    GaveUp { attempts: u32 },
    /// A replay for this tag is already running.
    InFlight,
    /// No registration, or no replay for the tag.
    Ignored,
}

#[derive(Debug, Default)]
struct Registration {
    attempts: u32,
    firing: bool,
    /// Registered again while its replay was running.
    rearmed: bool,
}

pub struct SyncManager {
    registrations: Mutex<HashMap<String, Registration>>,
    replays: RwLock<HashMap<String, Arc<dyn SyncReplay>>>,
    max_attempts: u32,
}

impl SyncManager {
    pub fn new(max_attempts: u32) -> Self {
        Self { registrations: Mutex::new(HashMap::new()), replays: RwLock::new(HashMap::new()), max_attempts }
    }

    /// Install the replay for a tag, replacing any previous one.
    pub async fn set_replay(&self, tag: impl Into<String>, replay: Arc<dyn SyncReplay>) {
        let tag: String = tag.into();
        self.replays.write().await.insert(tag.trim().to_string(), replay);
    }

    /// Record that work is waiting under `tag`.
    ///
    /// Registering a pending tag again is a no-op, unless its replay is
    /// running: then the tag stays pending after that replay succeeds.
    pub async fn register(&self, tag: &str) -> Result<(), Error> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(Error::InvalidInput("sync tag cannot be empty".into()));
        }
        let mut registrations = self.registrations.lock().await;
        match registrations.get_mut(tag) {
            Some(registration) if registration.firing => {
                registration.rearmed = true;
                tracing::debug!(tag, "sync registered again while replaying");
            }
            Some(_) => {}
            None => {
                registrations.insert(tag.to_string(), Registration::default());
                tracing::debug!(tag, "sync registered");
            }
        }
        Ok(())
    }

    /// Pending tags, sorted.
    pub async fn pending(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.registrations.lock().await.keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Run the replay for `tag` once and settle the registration.
    pub async fn on_sync(&self, tag: &str) -> SyncOutcome {
        let tag = tag.trim();
        {
            let mut registrations = self.registrations.lock().await;
            let Some(registration) = registrations.get_mut(tag) else {
                tracing::debug!(tag, "sync for unregistered tag ignored");
                return SyncOutcome::Ignored;
            };
            if registration.firing {
                return SyncOutcome::InFlight;
            }
            registration.firing = true;
        }

        let replay = self.replays.read().await.get(tag).cloned();
        let result = match replay {
            Some(replay) => Some(replay.replay(tag).await),
            None => None,
        };

        let mut registrations = self.registrations.lock().await;
        let Some(registration) = registrations.get_mut(tag) else {
            return SyncOutcome::Ignored;
        };
        registration.firing = false;
        let rearmed = std::mem::take(&mut registration.rearmed);

        match result {
            None => {
                tracing::warn!(tag, "no replay registered for sync tag");
                SyncOutcome::Ignored
            }
            Some(Ok(())) => {
                if rearmed {
                    registration.attempts = 0;
                    tracing::info!(tag, "sync replayed, newer registration still pending");
                } else {
                    registrations.remove(tag);
                    tracing::info!(tag, "sync replayed");
                }
                SyncOutcome::Replayed
            }
            Some(Err(err)) => {
                registration.attempts += 1;
                let attempts = registration.attempts;
                if attempts >= self.max_attempts && !rearmed {
                    registrations.remove(tag);
                    tracing::error!(tag, attempts, error = %err, "sync dropped after repeated failures");
                    SyncOutcome::GaveUp { attempts }
                } else {
                    tracing::warn!(tag, attempts, error = %err, "sync replay failed");
                    SyncOutcome::Retrying { attempts }
                }
            }
        }
    }

    /// Fire every pending tag once.
    pub async fn connectivity_restored(&self) -> Vec<(String, SyncOutcome)> {
        let mut outcomes = Vec::new();
        for tag in self.pending().await {
            let outcome = self.on_sync(&tag).await;
            outcomes.push((tag, outcome));
        }
        outcomes
    }
}
