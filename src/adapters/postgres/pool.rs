//! Connection pool construction and schema migrations.

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::domain::foundation::DomainError;

/// Open a pool using the configured sizing and timeouts.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let url = config
        .url()
        .ok_or_else(|| DomainError::database("No database URL configured"))?;
    let pool_config = &config.pool;

    info!(
        max_connections = pool_config.max_connections,
        min_connections = pool_config.min_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(pool_config.max_connections)
        .min_connections(pool_config.min_connections)
        .acquire_timeout(pool_config.acquire_timeout())
        .idle_timeout(pool_config.idle_timeout())
        .connect(url)
        .await
        .map_err(|e| DomainError::database(format!("Failed to connect: {}", e)))?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Apply the SQL files under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to run migrations: {}", e)))?;

    info!("Database migrations applied");
    Ok(())
}
