//! Billing Sync server binary.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use billing_sync::adapters::http::{billing_router, BillingAppState};
use billing_sync::adapters::memory::InMemoryBillingStore;
use billing_sync::adapters::postgres::{
    self, PostgresOrganizationRepository, PostgresSubscriptionRepository, PostgresUserRepository,
};
use billing_sync::adapters::usage::{HttpUsageLimitService, NoopUsageLimitService};
use billing_sync::application::{HandleBillingWebhookHandler, SubscriptionSynchronizer};
use billing_sync::config::AppConfig;
use billing_sync::observability::init_tracing;
use billing_sync::ports::{
    OrganizationRepository, SubscriptionRepository, UsageLimitService, UserRepository,
};

struct Repositories {
    organizations: Arc<dyn OrganizationRepository>,
    users: Arc<dyn UserRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.server.log_level, config.server.json_logs());

    let repositories = build_repositories(&config).await?;
    let usage = build_usage_service(&config)?;

    let synchronizer = SubscriptionSynchronizer::new(
        repositories.organizations,
        repositories.users,
        repositories.subscriptions,
        usage,
        config.billing.plan_mapper(),
    );
    let webhook_handler = Arc::new(HandleBillingWebhookHandler::new(
        config.billing.verifier(),
        synchronizer,
    ));

    if !webhook_handler.is_available() {
        warn!("Billing is disabled; webhook deliveries will be answered with 503");
    }

    let state = BillingAppState::new(webhook_handler, config.billing.signature_header.clone());
    let app = billing_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(address = %addr, environment = ?config.server.environment, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn build_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    if !config.database.is_configured() {
        warn!("No database URL configured, using the in-memory store");
        let store = Arc::new(InMemoryBillingStore::new());
        return Ok(Repositories {
            organizations: store.clone(),
            users: store.clone(),
            subscriptions: store,
        });
    }

    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
    }

    Ok(Repositories {
        organizations: Arc::new(PostgresOrganizationRepository::new(pool.clone())),
        users: Arc::new(PostgresUserRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool)),
    })
}

fn build_usage_service(config: &AppConfig) -> anyhow::Result<Arc<dyn UsageLimitService>> {
    match &config.usage.base_url {
        Some(base_url) => {
            info!(base_url = %base_url, "Usage metering enabled");
            Ok(Arc::new(HttpUsageLimitService::new(
                base_url.clone(),
                config.usage.timeout(),
            )?))
        }
        None => Ok(Arc::new(NoopUsageLimitService)),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
