//! HTTP handlers for billing endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::application::{HandleBillingWebhookCommand, HandleBillingWebhookHandler};
use crate::domain::billing::webhook_verifier::DEFAULT_MAX_BODY_BYTES;
use crate::domain::billing::WebhookError;

use super::dto::{HealthResponse, WebhookAccepted, WebhookErrorResponse};

// ════════════════════════════════════════════════════════════════════════════════
// State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub webhook_handler: Arc<HandleBillingWebhookHandler>,
    /// Name of the header carrying the provider signature.
    pub signature_header: String,
}

impl BillingAppState {
    pub fn new(
        webhook_handler: Arc<HandleBillingWebhookHandler>,
        signature_header: impl Into<String>,
    ) -> Self {
        Self {
            webhook_handler,
            signature_header: signature_header.into(),
        }
    }

    /// Body cap for the webhook route.
    pub fn max_body_bytes(&self) -> usize {
        self.webhook_handler
            .max_body_bytes()
            .unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/billing
///
/// Authenticated deliveries always get 200 so the provider stops retrying;
/// only rejected deliveries see an error status.
pub async fn handle_billing_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let body = body.map_err(|rejection| {
        let err = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            WebhookError::PayloadTooLarge {
                limit: state.max_body_bytes(),
            }
        } else {
            WebhookError::BodyRead(rejection.body_text())
        };
        warn!(error = %err, kind = err.kind(), "Webhook body rejected");
        err
    })?;

    let signature = headers
        .get(state.signature_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let cmd = HandleBillingWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    state.webhook_handler.handle(cmd).await?;

    Ok((StatusCode::OK, Json(WebhookAccepted::processed())))
}

/// GET /health
pub async fn health(State(state): State<BillingAppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        billing_available: state.webhook_handler.is_available(),
    })
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook rejections to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(WebhookError);

impl From<WebhookError> for BillingApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        (status, Json(WebhookErrorResponse::from(&self.0))).into_response()
    }
}
