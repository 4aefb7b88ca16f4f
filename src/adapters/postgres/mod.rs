//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresOrganizationRepository` - Organization lookup and plan writes
//! - `PostgresUserRepository` - User lookup and role writes
//! - `PostgresSubscriptionRepository` - Subscription rows, transactional with
//!   the owning organization
//! - `connect` / `run_migrations` - Pool setup

mod organization_repository;
mod pool;
mod subscription_repository;
mod user_repository;

pub use organization_repository::PostgresOrganizationRepository;
pub use pool::{connect, run_migrations};
pub use subscription_repository::PostgresSubscriptionRepository;
pub use user_repository::PostgresUserRepository;
