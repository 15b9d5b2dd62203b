//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{AppConfig, BACKGROUND_PROVIDERS};
use thiserror::Error;

const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn check_bytes(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
    }
    if value > MAX_BODY_BYTES {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must not exceed 50MB".into() });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - any byte ceiling is 0 or exceeds 50MB
    /// - `fetch_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `background_provider` is not a known provider id
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_bytes("html_max_bytes", self.html_max_bytes)?;
        check_bytes("icon_max_bytes", self.icon_max_bytes)?;
        check_bytes("background_max_bytes", self.background_max_bytes)?;

        if self.fetch_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.fetch_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "fetch_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        let provider = self.background_provider.trim().to_ascii_lowercase();
        if !BACKGROUND_PROVIDERS.contains(&provider.as_str()) {
            return Err(ConfigError::Invalid {
                field: "background_provider".into(),
                reason: format!("must be one of {}", BACKGROUND_PROVIDERS.join(", ")),
            });
        }

        if provider == "unsplash" && self.unsplash_access_key.is_none() {
            tracing::warn!(
                "background_provider is unsplash but no unsplash_access_key is set; \
                 backgrounds will fall back to the default image"
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
    fn test_validate_icon_max_bytes_zero() {
        let config = AppConfig { icon_max_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "icon_max_bytes"));
    }

    #[test]
    fn test_validate_html_max_bytes_exceeds_limit() {
        let config = AppConfig { html_max_bytes: 51 * 1024 * 1024, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "html_max_bytes"));
    }

    #[test]
    fn test_validate_timeout_too_small() {
        let config = AppConfig { fetch_timeout_ms: 50, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "fetch_timeout_ms"));
    }

    #[test]
    fn test_validate_timeout_exceeds_limit() {
        let config = AppConfig { fetch_timeout_ms: 301_000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "fetch_timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig { background_provider: "flickr".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "background_provider"));
    }

    #[test]
    fn test_validate_provider_ignores_case() {
        let config = AppConfig { background_provider: "Picsum".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unsplash_without_key_is_allowed() {
        let config = AppConfig { background_provider: "unsplash".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { icon_max_bytes: 1, fetch_timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
