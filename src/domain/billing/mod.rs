//! Billing domain - subscriptions, plans, roles and webhook verification.
//!
//! Pure types and rules. Persistence and HTTP live behind ports and adapters.

mod organization;
mod owner;
mod plan;
mod role;
mod status;
mod subscription;
mod sync_errors;
mod user;
mod webhook_errors;

pub mod provider_event;
pub mod webhook_verifier;

pub use organization::{Organization, OWNER_ROLE};
pub use owner::Owner;
pub use plan::{PlanMapper, PlanTier};
pub use provider_event::{
    BillingEvent, CheckoutSession, ProviderEvent, ProviderInvoice, ProviderSubscription,
};
pub use role::{role_after_sync, UserRole};
pub use status::SubscriptionStatus;
pub use subscription::Subscription;
pub use sync_errors::SyncError;
pub use user::User;
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, WebhookVerifier};
