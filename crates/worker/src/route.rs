//! Request classification.
//!
//! Classification is a pure function of the request and the worker's scope,
//! so every routing rule is testable without a store or a network.

use std::fmt;

use http::Method;
use rewind_client::is_same_origin;
use rewind_core::Request;
use url::Url;

use crate::manifest::StaticManifest;

/// Why a request is left to the platform untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    /// Not an http(s) URL (extensions, data:, blob:, ...).
    Scheme,
    /// Only `GET` is intercepted.
    Method,
    /// Different scheme, host or port than the storefront.
    CrossOrigin,
    /// The worker has not finished activating.
    NotControlled,
}

impl BypassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheme => "scheme",
            Self::Method => "method",
            Self::CrossOrigin => "cross_origin",
            Self::NotControlled => "not_controlled",
        }
    }
}

impl fmt::Display for BypassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caching strategy applied to an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Network first, any cached copy on failure, else offline JSON.
    NetworkFirstApi,
    /// Static partition first, network on miss.
    CacheFirstStatic,
    /// Network first, exact cached copy on failure, else offline page or text.
    NetworkFirstGeneric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Bypass(BypassReason),
    Handle(Strategy),
}

/// What the router needs to know about the deployment to classify requests.
#[derive(Debug, Clone)]
pub struct RouteScope {
    pub origin: Url,
    /// Root-relative path prefix of the data API, e.g. `/api/`.
    pub api_prefix: String,
    pub manifest: StaticManifest,
}

impl RouteScope {
    pub fn new(origin: Url, api_prefix: impl Into<String>, manifest: StaticManifest) -> Self {
        Self { origin, api_prefix: api_prefix.into(), manifest }
    }
}

/// Decide how a request is handled. Rules apply in order; the first match wins.
pub fn classify(request: &Request, scope: &RouteScope) -> Route {
    let url = &request.url;

    if !matches!(url.scheme(), "http" | "https") {
        return Route::Bypass(BypassReason::Scheme);
    }
    if request.method != Method::GET {
        return Route::Bypass(BypassReason::Method);
    }
    if !is_same_origin(url, &scope.origin) {
        return Route::Bypass(BypassReason::CrossOrigin);
    }

    let path = url.path();
    if path.starts_with(&scope.api_prefix) {
        Route::Handle(Strategy::NetworkFirstApi)
    } else if scope.manifest.contains(path) {
        Route::Handle(Strategy::CacheFirstStatic)
    } else {
        Route::Handle(Strategy::NetworkFirstGeneric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> RouteScope {
        RouteScope::new(
            Url::parse("https://shop.test").unwrap(),
            "/api/",
            StaticManifest::new(["/", "/index.html", "/manifest.json"]),
        )
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_non_http_scheme_bypasses() {
        let req = get("chrome-extension://abcdef/script.js");
        assert_eq!(classify(&req, &scope()), Route::Bypass(BypassReason::Scheme));
    }

    #[test]
    fn test_non_get_bypasses() {
        let req = Request::new(Method::POST, Url::parse("https://shop.test/api/orders").unwrap());
        assert_eq!(classify(&req, &scope()), Route::Bypass(BypassReason::Method));
    }

    #[test]
    fn test_cross_origin_bypasses() {
        let req = get("https://cdn.other.test/api/products");
        assert_eq!(classify(&req, &scope()), Route::Bypass(BypassReason::CrossOrigin));

        let req = get("https://shop.test:8443/index.html");
        assert_eq!(classify(&req, &scope()), Route::Bypass(BypassReason::CrossOrigin));
    }

    #[test]
    fn test_api_prefix_wins_over_manifest() {
        let mut scope = scope();
        scope.manifest = StaticManifest::new(["/api/config"]);
        let req = get("https://shop.test/api/config");
        assert_eq!(classify(&req, &scope), Route::Handle(Strategy::NetworkFirstApi));
    }

    #[test]
    fn test_api_requests() {
        let req = get("https://shop.test/api/products?category=denim");
        assert_eq!(classify(&req, &scope()), Route::Handle(Strategy::NetworkFirstApi));
    }

    #[test]
    fn test_prefix_needs_trailing_slash() {
        let req = get("https://shop.test/apiary");
        assert_eq!(classify(&req, &scope()), Route::Handle(Strategy::NetworkFirstGeneric));
    }

    #[test]
    fn test_manifest_paths_are_static() {
        for url in ["https://shop.test/", "https://shop.test/index.html", "https://shop.test/manifest.json"] {
            assert_eq!(classify(&get(url), &scope()), Route::Handle(Strategy::CacheFirstStatic), "{url}");
        }
    }

    #[test]
    fn test_other_paths_are_generic() {
        for url in ["https://shop.test/products/42", "https://shop.test/static/js/main.js"] {
            assert_eq!(classify(&get(url), &scope()), Route::Handle(Strategy::NetworkFirstGeneric), "{url}");
        }
    }
}
