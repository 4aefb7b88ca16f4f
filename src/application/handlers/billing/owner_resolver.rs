//! OwnerResolver - maps a billing customer id to its local owner.

use std::sync::Arc;

use crate::domain::billing::{Owner, SyncError};
use crate::ports::{OrganizationRepository, UserRepository};

/// Resolves external customer ids, organizations first.
///
/// When both an organization and a user carry the same customer id the
/// organization wins and the user table is never queried.
pub struct OwnerResolver {
    organizations: Arc<dyn OrganizationRepository>,
    users: Arc<dyn UserRepository>,
}

impl OwnerResolver {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            organizations,
            users,
        }
    }

    pub async fn resolve(&self, customer_id: &str) -> Result<Owner, SyncError> {
        if let Some(org) = self
            .organizations
            .find_by_billing_customer_id(customer_id)
            .await?
        {
            return Ok(Owner::Organization(org));
        }

        if let Some(user) = self.users.find_by_billing_customer_id(customer_id).await? {
            return Ok(Owner::User(user));
        }

        Err(SyncError::CustomerNotFound {
            customer_id: customer_id.to_string(),
        })
    }
}
