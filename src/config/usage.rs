//! Usage-metering service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Usage-metering collaborator configuration
///
/// Without a `base_url` quota updates are logged and skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageConfig {
    /// Base URL of the usage-metering service
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl UsageConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate usage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUsageServiceUrl);
            }
        }
        if self.timeout_secs == 0 || self.timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = UsageConfig::default();
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = UsageConfig {
            base_url: Some("usage.internal:9000".to_string()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidUsageServiceUrl));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let config = UsageConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidTimeout));
    }
}
