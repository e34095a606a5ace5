//! `/__worker/*` endpoints: lifecycle state, partitions and background events.

use axum::Json;
use axum::extract::{Path, State};
use bytes::Bytes;
use http::StatusCode;
use rewind_client::Network;
use rewind_core::{CacheStore, PartitionNames};
use rewind_worker::{ClickOutcome, Notification, SyncOutcome, WorkerState};
use serde::Serialize;

use crate::error::ServerError;
use crate::handler::AppState;

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub state: WorkerState,
    pub version: String,
    pub static_partition: String,
    pub dynamic_partition: String,
    pub pending_syncs: Vec<String>,
    pub pending_notifications: usize,
    pub started_at: String,
}

pub async fn status<S, N>(State(state): State<AppState<S, N>>) -> Json<StatusOutput>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    let worker = &state.worker;
    let names = &worker.settings().names;
    Json(StatusOutput {
        state: worker.state(),
        version: names.version().to_string(),
        static_partition: names.static_name(),
        dynamic_partition: names.dynamic_name(),
        pending_syncs: worker.pending_syncs().await,
        pending_notifications: worker.pending_notifications().await.len(),
        started_at: state.started_at.clone(),
    })
}

#[derive(Debug, Serialize)]
pub struct PartitionInfo {
    pub name: String,
    pub entries: u64,
    pub current: bool,
    pub owned: bool,
}

#[derive(Debug, Serialize)]
pub struct PartitionsOutput {
    pub partitions: Vec<PartitionInfo>,
}

pub async fn partitions<S, N>(State(state): State<AppState<S, N>>) -> Result<Json<PartitionsOutput>, ServerError>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    let store = state.worker.store();
    let listed = store.partition_names().await?;
    let partitions = describe(&**store, &state.worker.settings().names, listed).await?;
    Ok(Json(PartitionsOutput { partitions }))
}

/// Entry counts for listed partitions, skipping any deleted since the listing.
async fn describe<S: CacheStore>(
    store: &S, names: &PartitionNames, listed: Vec<String>,
) -> Result<Vec<PartitionInfo>, ServerError> {
    let mut partitions = Vec::with_capacity(listed.len());
    for name in listed {
        let Some(partition) = store.find(&name).await? else {
            continue;
        };
        partitions.push(PartitionInfo {
            entries: store.entry_count(&partition).await?,
            current: names.is_current(&name),
            owned: names.is_owned(&name),
            name,
        });
    }
    Ok(partitions)
}

/// Deliver a push message. The raw request body is the payload.
pub async fn push<S, N>(State(state): State<AppState<S, N>>, body: Bytes) -> Result<Json<Notification>, ServerError>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    let data = if body.is_empty() { None } else { Some(&body[..]) };
    Ok(Json(state.worker.handle_push(data).await?))
}

pub async fn click<S, N>(
    State(state): State<AppState<S, N>>, Path(id): Path<u64>,
) -> Result<Json<ClickOutcome>, ServerError>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    state
        .worker
        .handle_notification_click(id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("notification {id}")))
}

pub async fn close<S, N>(State(state): State<AppState<S, N>>, Path(id): Path<u64>) -> Result<StatusCode, ServerError>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    if state.worker.handle_notification_close(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(format!("notification {id}")))
    }
}

#[derive(Debug, Serialize)]
pub struct SyncRegistered {
    pub tag: String,
    pub pending: Vec<String>,
}

pub async fn register_sync<S, N>(
    State(state): State<AppState<S, N>>, Path(tag): Path<String>,
) -> Result<(StatusCode, Json<SyncRegistered>), ServerError>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    state.worker.register_sync(&tag).await?;
    let pending = state.worker.pending_syncs().await;
    Ok((StatusCode::ACCEPTED, Json(SyncRegistered { tag, pending })))
}

#[derive(Debug, Serialize)]
pub struct SyncResult {
    pub tag: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// Connectivity came back: replay every pending sync tag.
pub async fn online<S, N>(State(state): State<AppState<S, N>>) -> Json<Vec<SyncResult>>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    let results = state
        .worker
        .connectivity_restored()
        .await
        .into_iter()
        .map(|(tag, outcome)| SyncResult { tag, outcome })
        .collect();
    Json(results)
}
