//! Axum router configuration for billing endpoints.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{handle_billing_webhook, health, BillingAppState};

/// Create the billing router.
///
/// # Routes
/// - `POST /api/webhooks/billing` - Provider webhook, signature verified
/// - `GET /health` - Liveness plus billing availability
///
/// The webhook body limit is the configured cap; larger bodies are answered
/// with the JSON rejection body rather than axum's plain 413.
pub fn billing_router(state: BillingAppState, request_timeout: Duration) -> Router {
    let body_limit = state.max_body_bytes();

    let webhooks = Router::new()
        .route("/billing", post(handle_billing_webhook))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .nest("/api/webhooks", webhooks)
        .route("/health", get(health))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
