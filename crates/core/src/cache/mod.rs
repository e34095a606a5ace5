//! Partitioned response cache.
//!
//! This module provides the cache store used by the fetch router and the
//! lifecycle controller. It supports:
//!
//! - Named partitions per role and version (`rewind-static-v1`, ...)
//! - Request keys hashed with SHA-256 for storage
//! - A persistent SQLite backend with automatic schema migrations
//! - An in-memory backend with identical semantics
//! - Optional byte quotas

pub mod connection;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod naming;
pub mod partitions;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::{RequestKey, compute_request_key};
pub use memory::MemoryStore;
pub use naming::{PartitionNames, PartitionRole};
pub use store::{CacheStore, Partition};
