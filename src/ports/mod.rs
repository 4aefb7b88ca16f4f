//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these ports.
//!
//! ## Repository Ports
//!
//! - `OrganizationRepository` - Organization lookup and plan writes
//! - `UserRepository` - User lookup and role writes
//! - `SubscriptionRepository` - Subscription rows with a unique external id
//!
//! ## Collaborator Ports
//!
//! - `UsageLimitService` - External usage-metering quota recompute

mod organization_repository;
mod subscription_repository;
mod usage_limit_service;
mod user_repository;

pub use organization_repository::OrganizationRepository;
pub use subscription_repository::SubscriptionRepository;
pub use usage_limit_service::{UsageLimitError, UsageLimitService};
pub use user_repository::UserRepository;
