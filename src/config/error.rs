//! Configuration errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A configuration value that parsed but is not usable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    // server
    #[error("server.host must be an IP address")]
    InvalidBindAddress,
    #[error("server.port must be non-zero")]
    InvalidPort,
    #[error("Timeout is out of range")]
    InvalidTimeout,

    // database
    #[error("database.url must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,
    #[error("database.pool.min_connections exceeds max_connections, or max is zero")]
    InvalidPoolSize,
    #[error("database.pool.max_connections is above 100")]
    PoolSizeTooLarge,

    // billing
    #[error("billing.signature_tolerance_secs must be within 1..=3600")]
    InvalidSignatureTolerance,
    #[error("billing.max_body_bytes must be within 1..=1048576")]
    InvalidBodyLimit,
    #[error("billing.signature_header is empty")]
    InvalidSignatureHeader,

    // usage
    #[error("usage.base_url must be an http(s) URL")]
    InvalidUsageServiceUrl,
}
