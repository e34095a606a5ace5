//! Core types and shared functionality for the rewind offline layer.
//!
//! This crate provides:
//! - Request and response values seen by the fetch path
//! - Partitioned cache store with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use cache::{CacheDb, CacheStore, MemoryStore, Partition, PartitionNames, RequestKey};
pub use config::AppConfig;
pub use error::Error;
pub use request::Request;
pub use response::ResponseSnapshot;
