//! Webhook signature verification.
//!
//! HMAC-SHA256 over `"{timestamp}.{raw_body}"` with a symmetric timestamp
//! tolerance. The header may carry several `v1` candidates during secret
//! rotation; any one matching is sufficient.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::provider_event::ProviderEvent;
use super::webhook_errors::WebhookError;

/// Default replay window in either direction (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Default cap on the raw body (64 KiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 65_536;

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// Every `v1` signature present, in header order.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a header of the form `t=<timestamp>,v1=<hex>[,v1=<hex>...]`.
    ///
    /// Unknown keys are ignored. A `v1` value that is not valid hex is kept as
    /// a non-matching candidate rather than failing the whole header.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::MalformedSignature("invalid header format".into()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::MalformedSignature("invalid timestamp".into())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).unwrap_or_default());
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::MalformedSignature("missing timestamp".into()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::MalformedSignature("missing v1 signature".into()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for provider webhook signatures.
pub struct WebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
    max_body_bytes: usize,
}

impl WebhookVerifier {
    /// Creates a verifier with the default tolerance and body cap.
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Verifies the signature against the current time and parses the envelope.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<ProviderEvent, WebhookError> {
        self.verify_and_parse_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Verifies the signature against `now` (Unix seconds) and parses the envelope.
    ///
    /// Order: size cap, header parse, timestamp window, signature, JSON.
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<ProviderEvent, WebhookError> {
        self.verify_at(payload, signature_header, now)?;

        serde_json::from_slice(payload).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
    }

    /// Authenticates the payload without parsing it.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), WebhookError> {
        if payload.len() > self.max_body_bytes {
            return Err(WebhookError::PayloadTooLarge {
                limit: self.max_body_bytes,
            });
        }

        let header = SignatureHeader::parse(signature_header)?;

        self.validate_timestamp(header.timestamp, now)?;

        let expected = self.compute_signature(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::SignatureMismatch);
        }

        Ok(())
    }

    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        // `t=` is untrusted; abs_diff cannot overflow.
        if now.abs_diff(timestamp) > self.tolerance_secs.unsigned_abs() {
            return Err(WebhookError::TimestampOutsideTolerance);
        }
        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::BillingDisabled)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a hex HMAC-SHA256 signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let signed_payload = format!("{}.{}", timestamp, payload);
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
