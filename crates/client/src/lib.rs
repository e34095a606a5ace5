//! Network side of the rewind offline layer.
//!
//! This crate provides the `Network` seam the fetch strategies call, a
//! reqwest-backed implementation, and URL resolution against the storefront
//! origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, is_same_origin, resolve, resolve_http};
