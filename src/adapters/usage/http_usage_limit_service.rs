//! HTTP client for the usage-metering service.
//!
//! Posts `{"user_id", "price_id"}` to `<base_url>/internal/usage/limits`.
//! Any non-2xx answer or transport failure becomes a `UsageLimitError`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::domain::foundation::UserId;
use crate::ports::{UsageLimitError, UsageLimitService};

#[derive(Debug, Serialize)]
struct UpdateLimitsRequest<'a> {
    user_id: &'a str,
    price_id: &'a str,
}

pub struct HttpUsageLimitService {
    client: Client,
    base_url: String,
}

impl HttpUsageLimitService {
    /// Creates a client with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, UsageLimitError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UsageLimitError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn limits_url(&self) -> String {
        format!("{}/internal/usage/limits", self.base_url)
    }
}

#[async_trait]
impl UsageLimitService for HttpUsageLimitService {
    async fn update_limits(&self, user_id: &UserId, price_id: &str) -> Result<(), UsageLimitError> {
        let response = self
            .client
            .post(self.limits_url())
            .json(&UpdateLimitsRequest {
                user_id: user_id.as_str(),
                price_id,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UsageLimitError::Unavailable("request timed out".to_string())
                } else {
                    UsageLimitError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UsageLimitError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
