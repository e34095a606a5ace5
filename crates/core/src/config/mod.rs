//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REWIND_*)
//! 2. TOML config file (if REWIND_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::PartitionNames;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REWIND_*, `__` separates nested keys)
/// 2. TOML config file (if REWIND_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin the storefront is served from; only same-origin traffic is mediated.
    ///
    /// Set via REWIND_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Address the host listens on.
    ///
    /// Set via REWIND_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite cache database.
    ///
    /// Set via REWIND_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Shared prefix of every partition name this layer owns.
    ///
    /// Set via REWIND_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token of the deployed worker. Bumping it evicts old partitions on activate.
    ///
    /// Set via REWIND_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Total body bytes the cache may hold; unlimited when unset.
    ///
    /// Set via REWIND_QUOTA_BYTES environment variable.
    #[serde(default)]
    pub quota_bytes: Option<u64>,

    /// Path prefix routed network-first with the JSON offline payload.
    ///
    /// Set via REWIND_API_PREFIX environment variable.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Root-relative paths precached into the static partition on install.
    ///
    /// Set via REWIND_STATIC_ASSETS environment variable as an array
    /// (`REWIND_STATIC_ASSETS='["/", "/index.html"]'`).
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Offline fallback document seeded into the dynamic partition.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Stylesheet of the offline fallback document.
    #[serde(default = "default_offline_stylesheet")]
    pub offline_stylesheet: String,

    /// User-Agent string for network requests.
    ///
    /// Set via REWIND_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via REWIND_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    ///
    /// Set via REWIND_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Push notification presentation.
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Background sync.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Fixed presentation of push notifications and generic fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_icon")]
    pub badge: String,

    /// Vibration pattern in milliseconds (vibrate, pause, vibrate, ...).
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,

    /// Title used when the payload has none or cannot be parsed.
    #[serde(default = "default_title")]
    pub default_title: String,

    /// Body used when the payload has none or cannot be parsed.
    #[serde(default = "default_body")]
    pub default_body: String,

    /// Click target used when the payload has none.
    #[serde(default = "default_click_url")]
    pub default_url: String,
}

/// Background sync tags and their replay targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Tag under which deferred order submissions are replayed.
    #[serde(default = "default_order_tag")]
    pub order_tag: String,

    /// Origin path the order replay posts to.
    #[serde(default = "default_order_endpoint")]
    pub order_endpoint: String,

    /// Failed replays before a registration is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./rewind-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "rewind".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_static_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/favicon.ico", "/logo192.png", "/logo512.png", "/logo.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_offline_stylesheet() -> String {
    "/offline.css".into()
}

fn default_user_agent() -> String {
    "rewind-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_icon() -> String {
    "/logo192.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_title() -> String {
    "Rewind Vintage".into()
}

fn default_body() -> String {
    "Something new just arrived.".into()
}

fn default_click_url() -> String {
    "/".into()
}

fn default_order_tag() -> String {
    "sync-orders".into()
}

fn default_order_endpoint() -> String {
    "/api/orders/sync".into()
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            icon: default_icon(),
            badge: default_icon(),
            vibrate: default_vibrate(),
            default_title: default_title(),
            default_body: default_body(),
            default_url: default_click_url(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            order_tag: default_order_tag(),
            order_endpoint: default_order_endpoint(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            quota_bytes: None,
            api_prefix: default_api_prefix(),
            static_assets: default_static_assets(),
            offline_page: default_offline_page(),
            offline_stylesheet: default_offline_stylesheet(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            notification: NotificationConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed storefront origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Partition names of the configured version.
    pub fn partition_names(&self) -> PartitionNames {
        PartitionNames::new(&self.cache_prefix, &self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REWIND_`
    /// 2. TOML file from `REWIND_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REWIND_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REWIND_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.origin, "http://localhost:3000");
        assert_eq!(config.db_path, PathBuf::from("./rewind-cache.sqlite"));
        assert_eq!(config.cache_prefix, "rewind");
        assert_eq!(config.cache_version, "v1");
        assert_eq!(config.api_prefix, "/api/");
        assert_eq!(config.static_assets.len(), 7);
        assert!(config.static_assets.contains(&"/manifest.json".to_string()));
        assert_eq!(config.offline_page, "/offline.html");
        assert_eq!(config.offline_stylesheet, "/offline.css");
        assert_eq!(config.notification.vibrate, vec![100, 50, 100]);
        assert_eq!(config.sync.order_tag, "sync-orders");
        assert!(config.quota_bytes.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_partition_names_follow_version() {
        let config = AppConfig { cache_version: "v7".into(), ..Default::default() };
        assert_eq!(config.partition_names().static_name(), "rewind-static-v7");
    }

    #[test]
    fn test_origin_url_rejects_non_http() {
        let config = AppConfig { origin: "ftp://shop.test".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_load_layers_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "rewind.toml",
                r#"
                cache_version = "v3"
                static_assets = ["/", "/index.html"]

                [notification]
                default_title = "Fresh drops"
                "#,
            )?;
            jail.set_env("REWIND_CONFIG_FILE", "rewind.toml");
            jail.set_env("REWIND_ORIGIN", "https://shop.test");
            jail.set_env("REWIND_NOTIFICATION__ICON", "/icons/bell.png");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_version, "v3");
            assert_eq!(config.static_assets, vec!["/".to_string(), "/index.html".to_string()]);
            assert_eq!(config.origin, "https://shop.test");
            assert_eq!(config.notification.default_title, "Fresh drops");
            assert_eq!(config.notification.icon, "/icons/bell.png");
            assert_eq!(config.notification.badge, "/logo192.png");
            Ok(())
        });
    }
}
