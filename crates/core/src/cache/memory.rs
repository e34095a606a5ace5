//! In-memory cache store.
//!
//! Same semantics as the SQLite backend, held in a `HashMap` behind a tokio
//! `RwLock`. Nothing survives the process; used for tests and ephemeral hosts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::store::{CacheStore, Partition};
use super::RequestKey;
use crate::{Error, ResponseSnapshot};

#[derive(Debug, Default)]
struct MemoryPartition {
    seq: u64,
    entries: HashMap<RequestKey, ResponseSnapshot>,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    partitions: HashMap<String, MemoryPartition>,
}

impl Inner {
    fn stored_bytes_except(&self, partition: &str, key: &RequestKey) -> u64 {
        self.partitions
            .iter()
            .flat_map(|(name, p)| p.entries.iter().map(move |(k, v)| (name, k, v)))
            .filter(|(name, k, _)| !(name.as_str() == partition && *k == key))
            .map(|(_, _, v)| v.len() as u64)
            .sum()
    }
}

/// Partitioned store held entirely in memory.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total stored body bytes across all partitions.
    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> Result<Partition, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("partition name cannot be empty".into()));
        }

        let mut inner = self.inner.write().await;
        if !inner.partitions.contains_key(name) {
            inner.next_seq += 1;
            let seq = inner.next_seq;
            inner.partitions.insert(name.to_string(), MemoryPartition { seq, entries: HashMap::new() });
        }
        Ok(Partition::new(name))
    }

    async fn find(&self, name: &str) -> Result<Option<Partition>, Error> {
        let inner = self.inner.read().await;
        Ok(inner.partitions.contains_key(name).then(|| Partition::new(name)))
    }

    async fn put(&self, partition: &Partition, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error> {
        let mut inner = self.inner.write().await;

        if let Some(quota) = self.quota_bytes {
            let used = inner.stored_bytes_except(partition.name(), key);
            let needed = response.len() as u64;
            if used + needed > quota {
                return Err(Error::QuotaExceeded { needed, available: quota.saturating_sub(used) });
            }
        }

        let target = inner
            .partitions
            .get_mut(partition.name())
            .ok_or_else(|| Error::InvalidState(format!("partition {} has been deleted", partition.name())))?;
        target.entries.insert(key.clone(), response.clone());
        Ok(())
    }

    async fn match_request(
        &self, key: &RequestKey, scope: Option<&Partition>,
    ) -> Result<Option<ResponseSnapshot>, Error> {
        let inner = self.inner.read().await;

        if let Some(partition) = scope {
            return Ok(inner
                .partitions
                .get(partition.name())
                .and_then(|p| p.entries.get(key))
                .cloned());
        }

        Ok(inner
            .partitions
            .values()
            .filter_map(|p| p.entries.get(key).map(|hit| (p.seq, hit)))
            .max_by_key(|(seq, _)| *seq)
            .map(|(_, hit)| hit.clone()))
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        let inner = self.inner.read().await;
        let mut names: Vec<(u64, String)> = inner.partitions.iter().map(|(n, p)| (p.seq, n.clone())).collect();
        names.sort_unstable();
        Ok(names.into_iter().map(|(_, n)| n).collect())
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        Ok(self.inner.write().await.partitions.remove(name).is_some())
    }

    async fn entry_count(&self, partition: &Partition) -> Result<u64, Error> {
        let inner = self.inner.read().await;
        Ok(inner
            .partitions
            .get(partition.name())
            .map_or(0, |p| p.entries.len() as u64))
    }
}
