//! Usage-limit service used when no metering URL is configured.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::foundation::UserId;
use crate::ports::{UsageLimitError, UsageLimitService};

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUsageLimitService;

#[async_trait]
impl UsageLimitService for NoopUsageLimitService {
    async fn update_limits(&self, user_id: &UserId, price_id: &str) -> Result<(), UsageLimitError> {
        debug!(user_id = %user_id, price_id, "Usage metering not configured, skipping");
        Ok(())
    }
}
