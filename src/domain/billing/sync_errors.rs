//! Errors raised while applying an authentic event to local state.
//!
//! None of these reach the provider as a failure: the dispatcher logs them
//! and acknowledges the delivery.

use thiserror::Error;

use crate::domain::foundation::DomainError;

#[derive(Debug, Error)]
pub enum SyncError {
    /// No organization or user is bound to the customer id.
    #[error("No owner found for customer {customer_id}")]
    CustomerNotFound { customer_id: String },

    /// No local row for the external subscription id.
    #[error("Subscription {external_subscription_id} not found")]
    SubscriptionNotFound { external_subscription_id: String },

    /// Organization has no member holding the owner role.
    #[error("Organization {organization_id} has no owner")]
    OrganizationOwnerMissing { organization_id: String },

    /// A second row for the same external subscription id was rejected.
    #[error("Subscription {external_subscription_id} already exists")]
    DuplicateSubscription { external_subscription_id: String },

    /// Repository failure.
    #[error("Persistence failure: {0}")]
    Persistence(DomainError),
}

impl SyncError {
    /// Missing local data the provider cannot fix by retrying.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            SyncError::CustomerNotFound { .. }
                | SyncError::SubscriptionNotFound { .. }
                | SyncError::OrganizationOwnerMissing { .. }
        )
    }

    /// Expected under at-least-once delivery.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, SyncError::DuplicateSubscription { .. })
    }
}

impl From<DomainError> for SyncError {
    fn from(err: DomainError) -> Self {
        SyncError::Persistence(err)
    }
}
