//! In-memory usage-limit service.
//!
//! Records every quota update instead of calling the metering service.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::foundation::UserId;
use crate::ports::{UsageLimitError, UsageLimitService};

/// One recorded `update_limits` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageLimitCall {
    pub user_id: UserId,
    pub price_id: String,
}

#[derive(Default)]
pub struct InMemoryUsageLimitService {
    calls: Mutex<Vec<UsageLimitCall>>,
    fail: Mutex<bool>,
}

impl InMemoryUsageLimitService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service whose every call fails after being recorded.
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: Mutex::new(true),
        }
    }

    pub fn calls(&self) -> Vec<UsageLimitCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl UsageLimitService for InMemoryUsageLimitService {
    async fn update_limits(&self, user_id: &UserId, price_id: &str) -> Result<(), UsageLimitError> {
        self.calls
            .lock()
            .map_err(|_| UsageLimitError::Unavailable("recorder lock poisoned".to_string()))?
            .push(UsageLimitCall {
                user_id: user_id.clone(),
                price_id: price_id.to_string(),
            });

        let fail = *self
            .fail
            .lock()
            .map_err(|_| UsageLimitError::Unavailable("recorder lock poisoned".to_string()))?;
        if fail {
            return Err(UsageLimitError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}
