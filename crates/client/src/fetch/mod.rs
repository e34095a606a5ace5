//! Network fetch pipeline.
//!
//! ### Network seam
//! - [`Network`] is what the fetch strategies and the install step call.
//! - A response with any HTTP status is a successful fetch; only transport
//!   failures (connect, DNS, timeout, oversize body) are errors.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use bytes::Bytes;
use reqwest::Client;
use rewind_core::{Error, Request, ResponseSnapshot};
use std::time::{Duration, Instant};

pub use url::{UrlError, is_same_origin, resolve, resolve_http};

/// Request headers that describe the hop to this layer, not the request.
const HOP_HEADERS: &[&str] = &["host", "connection", "content-length", "transfer-encoding", "upgrade", "te"];

/// Anything that can turn a request into a response over the network.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// Returns an error for which [`Error::is_network`] holds when no
    /// response could be obtained.
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "rewind-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "rewind-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    /// Fetch settings from application configuration.
    pub fn from_app(config: &rewind_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed network client.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn classify(err: &reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes))
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        let start = Instant::now();

        let mut headers = request.headers.clone();
        for name in HOP_HEADERS {
            headers.remove(*name);
        }

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| Self::classify(&e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes: Bytes = response.bytes().await.map_err(|e| Self::classify(&e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(bytes.len()));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(ResponseSnapshot::new(status, headers, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "rewind-sw/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = rewind_core::AppConfig { user_agent: "shop/2".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from_app(&app);
        assert_eq!(config.user_agent, "shop/2");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = FetchConfig { timeout: Duration::from_millis(500), ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        // Port 9 on loopback (discard) is closed on test machines.
        let request = Request::get(::url::Url::parse("http://127.0.0.1:9/").unwrap());

        let err = client.fetch(&request).await.unwrap_err();
        assert!(err.is_network());
    }
}
