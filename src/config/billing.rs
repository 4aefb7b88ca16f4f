//! Billing configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::webhook_verifier::{DEFAULT_MAX_BODY_BYTES, DEFAULT_TOLERANCE_SECS};
use crate::domain::billing::{PlanMapper, WebhookVerifier};

use super::error::ValidationError;

/// Billing webhook configuration
///
/// The service is available only when `enabled` is set and the signing
/// secret is non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Master switch for the webhook endpoint
    #[serde(default)]
    pub enabled: bool,

    /// Shared webhook signing secret
    #[serde(default = "empty_secret")]
    pub webhook_secret: SecretString,

    /// Provider price ID for the pro plan
    #[serde(default)]
    pub pro_price_id: String,

    /// Provider price ID for the enterprise plan
    #[serde(default)]
    pub enterprise_price_id: String,

    /// Replay window in either direction, in seconds
    #[serde(default = "default_tolerance")]
    pub signature_tolerance_secs: i64,

    /// Cap on the raw webhook body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Name of the header carrying the signature
    #[serde(default = "default_signature_header")]
    pub signature_header: String,
}

impl BillingConfig {
    /// Check that billing is switched on and has a secret to verify with
    pub fn is_available(&self) -> bool {
        self.enabled && !self.webhook_secret.expose_secret().is_empty()
    }

    /// Plan mapper built from the configured price IDs
    pub fn plan_mapper(&self) -> PlanMapper {
        PlanMapper::new(self.pro_price_id.clone(), self.enterprise_price_id.clone())
    }

    /// Verifier for incoming webhooks, or `None` when billing is unavailable
    pub fn verifier(&self) -> Option<WebhookVerifier> {
        if !self.is_available() {
            return None;
        }
        Some(
            WebhookVerifier::new(self.webhook_secret.clone())
                .with_tolerance_secs(self.signature_tolerance_secs)
                .with_max_body_bytes(self.max_body_bytes),
        )
    }

    /// Validate billing configuration
    ///
    /// A disabled service only needs sane limits. An enabled one must carry
    /// the signing secret and the enterprise price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=3600).contains(&self.signature_tolerance_secs) {
            return Err(ValidationError::InvalidSignatureTolerance);
        }
        if self.max_body_bytes == 0 || self.max_body_bytes > 1024 * 1024 {
            return Err(ValidationError::InvalidBodyLimit);
        }
        if self.signature_header.trim().is_empty() {
            return Err(ValidationError::InvalidSignatureHeader);
        }

        if !self.enabled {
            return Ok(());
        }
        if self.webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_SYNC__BILLING__WEBHOOK_SECRET"));
        }
        if self.enterprise_price_id.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING_SYNC__BILLING__ENTERPRISE_PRICE_ID"));
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_secret: empty_secret(),
            pro_price_id: String::new(),
            enterprise_price_id: String::new(),
            signature_tolerance_secs: default_tolerance(),
            max_body_bytes: default_max_body_bytes(),
            signature_header: default_signature_header(),
        }
    }
}

fn empty_secret() -> SecretString {
    SecretString::new(String::new())
}

fn default_tolerance() -> i64 {
    DEFAULT_TOLERANCE_SECS
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_signature_header() -> String {
    "Stripe-Signature".to_string()
}
