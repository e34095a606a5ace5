//! Assets precached at install time.

use rewind_client::resolve_http;
use rewind_core::Error;
use url::Url;

/// Ordered, duplicate-free list of root-relative shell asset paths.
///
/// Fixed for the life of a deployed version. A new version ships a new
/// manifest; there is no incremental update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticManifest {
    paths: Vec<String>,
}

impl StaticManifest {
    /// Build a manifest, keeping the first occurrence of repeated paths.
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for path in paths {
            let path = path.into();
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        Self { paths: unique }
    }

    /// Whether `path` is exactly one of the manifest entries.
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Absolute URLs of every entry, in order.
    pub fn urls(&self, origin: &Url) -> Result<Vec<Url>, Error> {
        self.paths
            .iter()
            .map(|p| resolve_http(origin, p).map_err(|e| Error::InvalidUrl(format!("{p}: {e}"))))
            .collect()
    }
}

/// The offline document and its stylesheet, seeded into the dynamic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineFallback {
    pub page: String,
    pub stylesheet: String,
}

impl OfflineFallback {
    pub fn new(page: impl Into<String>, stylesheet: impl Into<String>) -> Self {
        Self { page: page.into(), stylesheet: stylesheet.into() }
    }

    /// Absolute URLs of the page and stylesheet.
    pub fn urls(&self, origin: &Url) -> Result<Vec<Url>, Error> {
        [&self.page, &self.stylesheet]
            .into_iter()
            .map(|p| resolve_http(origin, p).map_err(|e| Error::InvalidUrl(format!("{p}: {e}"))))
            .collect()
    }

    pub fn page_url(&self, origin: &Url) -> Result<Url, Error> {
        resolve_http(origin, &self.page).map_err(|e| Error::InvalidUrl(format!("{}: {e}", self.page)))
    }
}
