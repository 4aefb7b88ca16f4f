//! Response DTOs for billing HTTP endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::billing::WebhookError;

/// Body returned for every authenticated delivery, whatever the sync outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAccepted {
    pub success: bool,
    pub message: String,
}

impl WebhookAccepted {
    pub fn processed() -> Self {
        Self {
            success: true,
            message: "Webhook processed".to_string(),
        }
    }
}

/// Error body for rejected deliveries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookErrorResponse {
    /// Machine-readable error label.
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code, repeated in the body.
    pub code: u16,
}

impl From<&WebhookError> for WebhookErrorResponse {
    fn from(err: &WebhookError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
            code: err.status_code().as_u16(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub billing_available: bool,
}
