//! Subscription repository port.
//!
//! # Design
//!
//! - **Unique external id**: a second insert for the same
//!   `external_subscription_id` fails with `DuplicateSubscription` and leaves
//!   exactly one row
//! - **Atomic organization writes**: the `*_with_organization` methods apply
//!   both rows or neither

use async_trait::async_trait;

use crate::domain::billing::{Organization, Subscription};
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription by the provider's subscription id.
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Insert a new subscription.
    ///
    /// # Errors
    ///
    /// - `DuplicateSubscription` if the external id already exists
    /// - `DatabaseError` on persistence failure
    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Overwrite an existing subscription's mutable fields.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the row is gone
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Insert a subscription and update its organization's billing fields atomically.
    async fn create_with_organization(
        &self,
        subscription: &Subscription,
        organization: &Organization,
    ) -> Result<(), DomainError>;

    /// Update a subscription and its organization's billing fields atomically.
    async fn update_with_organization(
        &self,
        subscription: &Subscription,
        organization: &Organization,
    ) -> Result<(), DomainError>;
}
