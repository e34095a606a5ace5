//! Request keys and their persisted digests.

use std::fmt;

use http::Method;
use sha2::{Digest, Sha256};
use url::Url;

/// Cache identity of a request: method plus absolute URL.
///
/// The query string is significant; the fragment is not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method: method.as_str().to_ascii_uppercase(), url: url.into() }
    }

    /// Key for a `GET` of the given URL.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hex SHA-256 digest used as the stored key.
    pub fn digest(&self) -> String {
        compute_request_key(&self.method, &self.url)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Compute the stored key digest for a method and absolute URL.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
