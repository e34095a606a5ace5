//! URL resolution against the storefront origin.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a root-relative path or absolute URL against `base`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative input against `base`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// The scheme is not restricted here; scheme filtering is a routing decision.
pub fn resolve(base: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if let Some(host) = parsed.host_str()
        && host.chars().any(|c| c.is_ascii_uppercase())
    {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Resolve and require an http(s) result.
pub fn resolve_http(base: &Url, input: &str) -> Result<Url, UrlError> {
    let url = resolve(base, input)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}

/// Whether two URLs share scheme, host and port.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
