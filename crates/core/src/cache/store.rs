//! The cache store seam.
//!
//! The router and lifecycle controller only see this trait, so they run
//! unchanged against SQLite in production and the in-memory store in tests.

use crate::{Error, ResponseSnapshot};

use super::RequestKey;

/// Handle to an opened partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Partition {
    name: String,
}

impl Partition {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Partitioned request/response store.
///
/// Writes to the same key in the same partition overwrite; concurrent
/// writers race and the last one wins. There are no cross-key invariants,
/// so implementations need no locking beyond per-operation atomicity.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a partition, creating it if absent. Idempotent.
    async fn open(&self, name: &str) -> Result<Partition, Error>;

    /// Handle to an existing partition. Never creates one.
    async fn find(&self, name: &str) -> Result<Option<Partition>, Error>;

    /// Insert or overwrite the response stored for `key`.
    ///
    /// Fails with [`Error::QuotaExceeded`] when the write does not fit.
    async fn put(&self, partition: &Partition, key: &RequestKey, response: &ResponseSnapshot) -> Result<(), Error>;

    /// Look up `key` in one partition, or in all partitions when `scope` is
    /// `None` (most recently created partition first).
    async fn match_request(
        &self, key: &RequestKey, scope: Option<&Partition>,
    ) -> Result<Option<ResponseSnapshot>, Error>;

    /// Names of all partitions, oldest first.
    async fn partition_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and everything in it. Returns whether it existed.
    async fn delete_partition(&self, name: &str) -> Result<bool, Error>;

    /// Number of entries in a partition.
    async fn entry_count(&self, partition: &Partition) -> Result<u64, Error>;
}
