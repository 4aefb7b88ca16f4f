//! Billing handlers.
//!
//! Webhook intake and the synchronizers it drives:
//!
//! - `HandleBillingWebhookHandler` verifies and decodes a delivery
//! - `EventDispatcher` routes it and logs failures
//! - `SubscriptionSynchronizer` applies subscription state
//! - `OwnerResolver`, `RoleSynchronizer` and `UsageLimitSynchronizer` support it

mod dispatcher;
mod handle_billing_webhook;
mod owner_resolver;
mod role_sync;
mod subscription_sync;
mod usage_sync;

pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use handle_billing_webhook::{
    HandleBillingWebhookCommand, HandleBillingWebhookHandler, HandleBillingWebhookResult,
};
pub use owner_resolver::OwnerResolver;
pub use role_sync::{RoleChange, RoleSynchronizer};
pub use subscription_sync::{SubscriptionSynchronizer, SyncOutcome};
pub use usage_sync::UsageLimitSynchronizer;
