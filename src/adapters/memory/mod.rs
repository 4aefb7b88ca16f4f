//! In-memory adapters for tests and local development.

mod billing_store;
mod usage_limit_recorder;

pub use billing_store::InMemoryBillingStore;
pub use usage_limit_recorder::{InMemoryUsageLimitService, UsageLimitCall};
