//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn check_root_relative(field: &str, path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') || path.starts_with("//") {
        return Err(invalid(field, format!("{path:?} must be a root-relative path")));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `cache_prefix` or `cache_version` is empty or contains whitespace
    /// - `api_prefix`, a static asset, or an offline path is not root-relative
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `sync.max_attempts` is 0
    ///
    /// Returns `ConfigError::Missing` if `static_assets` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.origin_url()?;

        if self.cache_prefix.is_empty() || self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("cache_prefix", "must be non-empty without whitespace"));
        }
        if self.cache_version.is_empty() || self.cache_version.chars().any(char::is_whitespace) {
            return Err(invalid("cache_version", "must be non-empty without whitespace"));
        }

        check_root_relative("api_prefix", &self.api_prefix)?;
        if self.api_prefix == "/" {
            return Err(invalid("api_prefix", "must not cover the whole origin"));
        }

        if self.static_assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "static_assets".into(),
                hint: "list at least the shell document, e.g. [\"/\"]".into(),
            });
        }
        for asset in &self.static_assets {
            check_root_relative("static_assets", asset)?;
        }
        check_root_relative("offline_page", &self.offline_page)?;
        check_root_relative("offline_stylesheet", &self.offline_stylesheet)?;
        check_root_relative("notification.default_url", &self.notification.default_url)?;
        check_root_relative("sync.order_endpoint", &self.sync.order_endpoint)?;

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.sync.max_attempts == 0 {
            return Err(invalid("sync.max_attempts", "must be at least 1"));
        }

        if let Some(quota) = self.quota_bytes
            && quota < self.max_bytes as u64
        {
            tracing::warn!(
                quota_bytes = quota,
                max_bytes = self.max_bytes,
                "quota_bytes is smaller than max_bytes; large responses will never be cached"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { cache_version: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_version"));
    }

    #[test]
    fn test_validate_relative_asset() {
        let config = AppConfig { static_assets: vec!["/".into(), "logo.png".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "static_assets"));
    }

    #[test]
    fn test_validate_protocol_relative_asset() {
        let config = AppConfig { static_assets: vec!["//cdn.test/app.js".into()], ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_manifest() {
        let config = AppConfig { static_assets: Vec::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "static_assets"));
    }

    #[test]
    fn test_validate_api_prefix_root() {
        let config = AppConfig { api_prefix: "/".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "api_prefix"));
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
    }

    #[test]
    fn test_validate_zero_sync_attempts() {
        let mut config = AppConfig::default();
        config.sync.max_attempts = 0;
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sync.max_attempts"));
    }

    #[test]
    fn test_validate_small_quota_is_allowed() {
        let config = AppConfig { quota_bytes: Some(1024), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
