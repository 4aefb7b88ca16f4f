//! HandleBillingWebhookHandler - Command handler for payment provider webhooks.

use tracing::{error, info, warn};

use crate::domain::billing::{WebhookError, WebhookVerifier};

use super::dispatcher::{DispatchOutcome, EventDispatcher};
use super::subscription_sync::SubscriptionSynchronizer;

/// Command to handle one webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleBillingWebhookCommand {
    /// Raw request body.
    pub payload: Vec<u8>,
    /// Signature header value, if the request carried one.
    pub signature: Option<String>,
}

/// Result of an authenticated delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleBillingWebhookResult {
    pub event_id: String,
    pub event_type: String,
    pub outcome: DispatchOutcome,
}

/// Handler for billing webhooks.
///
/// Constructed explicitly with its verifier and synchronizer and shared with
/// the HTTP layer. `verifier` is `None` when billing is disabled.
pub struct HandleBillingWebhookHandler {
    verifier: Option<WebhookVerifier>,
    dispatcher: EventDispatcher,
}

impl HandleBillingWebhookHandler {
    pub fn new(verifier: Option<WebhookVerifier>, synchronizer: SubscriptionSynchronizer) -> Self {
        Self {
            verifier,
            dispatcher: EventDispatcher::new(synchronizer),
        }
    }

    /// True when billing is enabled and has a signing secret.
    pub fn is_available(&self) -> bool {
        self.verifier.is_some()
    }

    /// Body cap enforced before verification, if billing is available.
    pub fn max_body_bytes(&self) -> Option<usize> {
        self.verifier.as_ref().map(WebhookVerifier::max_body_bytes)
    }

    /// Verifies, decodes and dispatches one delivery.
    ///
    /// Errors are only returned for rejected deliveries. Once the payload is
    /// authentic the result is `Ok` whatever the synchronizer did.
    pub async fn handle(
        &self,
        cmd: HandleBillingWebhookCommand,
    ) -> Result<HandleBillingWebhookResult, WebhookError> {
        let verifier = self.verifier.as_ref().ok_or(WebhookError::BillingDisabled)?;

        let result = match cmd.signature.as_deref() {
            Some(signature) => verifier.verify_and_parse(&cmd.payload, signature),
            None => Err(WebhookError::MissingSignature),
        };
        let envelope = result.map_err(|e| {
            warn!(error = %e, kind = e.kind(), bytes = cmd.payload.len(), "Webhook rejected");
            e
        })?;

        info!(
            event_id = %envelope.id,
            event_type = %envelope.event_type,
            livemode = envelope.livemode,
            "Webhook received"
        );

        // Authentic from here on: a retry of the same bytes cannot decode
        // any better, so shape mismatches are dropped and acknowledged.
        let event = match envelope.decode() {
            Ok(event) => event,
            Err(e) => {
                error!(
                    event_id = %envelope.id,
                    event_type = %envelope.event_type,
                    error = %e,
                    "Webhook object does not match its event type, dropping"
                );
                return Ok(HandleBillingWebhookResult {
                    event_id: envelope.id,
                    event_type: envelope.event_type,
                    outcome: DispatchOutcome::Dropped {
                        reason: format!("undecodable object: {}", e),
                    },
                });
            }
        };

        let outcome = self.dispatcher.dispatch(&envelope, event).await;

        Ok(HandleBillingWebhookResult {
            event_id: envelope.id,
            event_type: envelope.event_type,
            outcome,
        })
    }
}
