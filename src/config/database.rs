//! Database configuration
//!
//! ```text
//! BILLING_SYNC__DATABASE__URL=postgresql://billing@db/billing
//! BILLING_SYNC__DATABASE__POOL__MAX_CONNECTIONS=20
//! BILLING_SYNC__DATABASE__RUN_MIGRATIONS=true
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const MAX_POOL_SIZE: u32 = 100;

/// PostgreSQL settings.
///
/// Without a URL the service falls back to the in-memory store, which
/// production refuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; may embed credentials
    #[serde(default)]
    pub url: Option<SecretString>,

    #[serde(default)]
    pub pool: PoolConfig,

    /// Apply `migrations/` before serving
    #[serde(default)]
    pub run_migrations: bool,
}

/// Connection pool sizing and timeouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 2,
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_connections > MAX_POOL_SIZE {
            return Err(ValidationError::PoolSizeTooLarge);
        }
        if self.max_connections == 0 || self.min_connections > self.max_connections {
            return Err(ValidationError::InvalidPoolSize);
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// The configured URL, treating an empty value as absent.
    pub fn url(&self) -> Option<&str> {
        self.url
            .as_ref()
            .map(|url| url.expose_secret().as_str())
            .filter(|url| !url.trim().is_empty())
    }

    pub fn is_configured(&self) -> bool {
        self.url().is_some()
    }

    pub fn validate(&self, is_production: bool) -> Result<(), ValidationError> {
        let Some(url) = self.url() else {
            return if is_production {
                Err(ValidationError::MissingRequired("BILLING_SYNC__DATABASE__URL"))
            } else {
                Ok(())
            };
        };

        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(ValidationError::InvalidDatabaseUrl);
        }
        self.pool.validate()
    }
}
