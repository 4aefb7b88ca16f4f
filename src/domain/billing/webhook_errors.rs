//! Webhook rejection errors.
//!
//! Everything here is raised before an event reaches the dispatcher. Each
//! variant maps to the HTTP status the provider sees.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that reject an inbound webhook delivery.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    /// The signature header was absent from the request.
    #[error("Missing signature header")]
    MissingSignature,

    /// The signature header could not be parsed.
    #[error("Malformed signature header: {0}")]
    MalformedSignature(String),

    /// Signature timestamp is outside the tolerance window.
    #[error("Timestamp outside tolerance window")]
    TimestampOutsideTolerance,

    /// No candidate signature matched the payload.
    #[error("Invalid signature")]
    SignatureMismatch,

    /// Body exceeded the configured cap before verification.
    #[error("Payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The body could not be read from the request.
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// Authentic body that is not a provider event envelope.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Billing is switched off or missing its signing secret.
    #[error("Billing is not available")]
    BillingDisabled,
}

impl WebhookError {
    /// Short machine-readable label used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::MissingSignature => "missing_signature",
            WebhookError::MalformedSignature(_) => "malformed_signature",
            WebhookError::TimestampOutsideTolerance => "timestamp_outside_tolerance",
            WebhookError::SignatureMismatch => "invalid_signature",
            WebhookError::PayloadTooLarge { .. } => "payload_too_large",
            WebhookError::BodyRead(_) => "body_read_failed",
            WebhookError::InvalidPayload(_) => "invalid_payload",
            WebhookError::BillingDisabled => "billing_unavailable",
        }
    }

    /// Returns true for failures of the signature check itself.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::MalformedSignature(_)
                | WebhookError::TimestampOutsideTolerance
                | WebhookError::SignatureMismatch
        )
    }

    /// Maps the error to the HTTP status returned to the provider.
    ///
    /// Rejections are 400 so the provider retries with a fresh signature.
    /// A disabled service answers 503.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::BillingDisabled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
