//! Billing HTTP adapter.

mod dto;
mod handlers;
mod routes;

pub use dto::{HealthResponse, WebhookAccepted, WebhookErrorResponse};
pub use handlers::{BillingApiError, BillingAppState};
pub use routes::billing_router;
