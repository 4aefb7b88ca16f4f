//! UsageLimitSynchronizer - forwards plan changes to usage metering.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::foundation::UserId;
use crate::ports::UsageLimitService;

pub struct UsageLimitSynchronizer {
    service: Arc<dyn UsageLimitService>,
}

impl UsageLimitSynchronizer {
    pub fn new(service: Arc<dyn UsageLimitService>) -> Self {
        Self { service }
    }

    /// Asks the metering service to recompute quotas for `price_id`.
    ///
    /// Failures are logged and swallowed; prior writes stay committed.
    /// Returns whether the call succeeded.
    pub async fn sync(&self, user_id: &UserId, price_id: &str) -> bool {
        match self.service.update_limits(user_id, price_id).await {
            Ok(()) => {
                debug!(user_id = %user_id, price_id, "Usage limits updated");
                true
            }
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    price_id,
                    error = %e,
                    "Failed to update usage limits"
                );
                false
            }
        }
    }
}
