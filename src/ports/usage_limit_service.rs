//! Usage-metering collaborator port.
//!
//! Quotas are eventually consistent with billing: a failure here is logged by
//! the caller and never rolls back subscription or role writes.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::UserId;

#[derive(Debug, Error)]
pub enum UsageLimitError {
    #[error("Usage service unavailable: {0}")]
    Unavailable(String),

    #[error("Usage service rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait UsageLimitService: Send + Sync {
    /// Recompute the user's quota for the given price.
    ///
    /// An empty `price_id` clears paid limits.
    async fn update_limits(&self, user_id: &UserId, price_id: &str) -> Result<(), UsageLimitError>;
}
