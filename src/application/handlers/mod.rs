//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    DispatchOutcome, HandleBillingWebhookCommand, HandleBillingWebhookHandler,
    HandleBillingWebhookResult, SubscriptionSynchronizer, SyncOutcome,
};
