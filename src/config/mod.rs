//! Application configuration
//!
//! Everything comes from the environment (optionally seeded by a `.env`
//! file). Keys use the `BILLING_SYNC` prefix and `__` between sections:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `BILLING_SYNC__SERVER__PORT` | `server.port` |
//! | `BILLING_SYNC__DATABASE__URL` | `database.url` |
//! | `BILLING_SYNC__BILLING__WEBHOOK_SECRET` | `billing.webhook_secret` |
//! | `BILLING_SYNC__USAGE__BASE_URL` | `usage.base_url` |
//!
//! ```no_run
//! use billing_sync::config::AppConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

mod billing;
mod database;
mod error;
mod server;
mod usage;

pub use billing::BillingConfig;
pub use database::{DatabaseConfig, PoolConfig};
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use usage::UsageConfig;

use serde::Deserialize;

const ENV_PREFIX: &str = "BILLING_SYNC";
const ENV_SEPARATOR: &str = "__";

/// Root configuration.
///
/// Every section defaults, so an empty environment gives a development
/// server with billing switched off and the in-memory store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub billing: BillingConfig,
    pub usage: UsageConfig,
}

impl AppConfig {
    /// Read the environment into typed sections.
    ///
    /// Only fails on values that cannot be parsed into their field types;
    /// semantic checks live in [`AppConfig::validate`].
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let source = config::Environment::default()
            .prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true);

        let config = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Check cross-field rules. Startup aborts on the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate(self.is_production())?;
        self.billing.validate()?;
        self.usage.validate()
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::env;
    use std::sync::Mutex;

    // Environment variables are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "BILLING_SYNC__DATABASE__URL",
        "BILLING_SYNC__DATABASE__POOL__MAX_CONNECTIONS",
        "BILLING_SYNC__BILLING__ENABLED",
        "BILLING_SYNC__BILLING__WEBHOOK_SECRET",
        "BILLING_SYNC__BILLING__PRO_PRICE_ID",
        "BILLING_SYNC__BILLING__ENTERPRISE_PRICE_ID",
        "BILLING_SYNC__SERVER__PORT",
        "BILLING_SYNC__SERVER__ENVIRONMENT",
    ];

    fn load_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        for var in VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        for (key, _) in vars {
            env::remove_var(key);
        }
        result
    }

    const ENABLED: &[(&str, &str)] = &[
        ("BILLING_SYNC__DATABASE__URL", "postgresql://test@localhost/test"),
        ("BILLING_SYNC__BILLING__ENABLED", "true"),
        ("BILLING_SYNC__BILLING__WEBHOOK_SECRET", "whsec_xxx"),
        ("BILLING_SYNC__BILLING__PRO_PRICE_ID", "price_pro"),
        ("BILLING_SYNC__BILLING__ENTERPRISE_PRICE_ID", "price_enterprise"),
    ];

    // ══════════════════════════════════════════════════════════════
    // Loading
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn nested_sections_load_from_prefixed_vars() {
        let config = load_with(ENABLED).unwrap();

        assert_eq!(config.database.url(), Some("postgresql://test@localhost/test"));
        assert!(config.billing.enabled);
        assert_eq!(config.billing.webhook_secret.expose_secret(), "whsec_xxx");
        assert_eq!(config.billing.enterprise_price_id, "price_enterprise");
    }

    #[test]
    fn numbers_are_parsed() {
        let config = load_with(&[
            ("BILLING_SYNC__SERVER__PORT", "3000"),
            ("BILLING_SYNC__DATABASE__POOL__MAX_CONNECTIONS", "25"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.pool.max_connections, 25);
    }

    #[test]
    fn empty_environment_disables_billing() {
        let config = load_with(&[]).unwrap();

        assert!(config.validate().is_ok());
        assert!(!config.billing.is_available());
        assert!(!config.database.is_configured());
    }

    // ══════════════════════════════════════════════════════════════
    // Validation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn enabled_billing_validates() {
        let config = load_with(ENABLED).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.billing.is_available());
    }

    #[test]
    fn enabled_billing_needs_secret() {
        let vars: Vec<_> = ENABLED
            .iter()
            .copied()
            .filter(|(key, _)| *key != "BILLING_SYNC__BILLING__WEBHOOK_SECRET")
            .collect();
        let config = load_with(&vars).unwrap();

        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("BILLING_SYNC__BILLING__WEBHOOK_SECRET"))
        );
    }

    #[test]
    fn production_needs_database() {
        let config = load_with(&[("BILLING_SYNC__SERVER__ENVIRONMENT", "production")]).unwrap();

        assert!(config.is_production());
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("BILLING_SYNC__DATABASE__URL"))
        );
    }
}
