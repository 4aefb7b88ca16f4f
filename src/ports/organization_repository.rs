//! Organization repository port.
//!
//! Billing only reads organizations by customer id and writes back the plan
//! tier and subscription pointer. Everything else about an organization is
//! owned elsewhere.

use async_trait::async_trait;

use crate::domain::billing::Organization;
use crate::domain::foundation::{DomainError, OrganizationId, UserId};

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Find the organization bound to an external billing customer id.
    async fn find_by_billing_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Organization>, DomainError>;

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError>;

    /// Find the user holding the owner membership role in the organization.
    ///
    /// Returns `None` if the organization has no owner.
    async fn find_owner_user_id(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<UserId>, DomainError>;

    /// Persist `plan`, `external_subscription_id` and `updated_at`.
    ///
    /// Other columns are left untouched.
    ///
    /// # Errors
    ///
    /// - `OrganizationNotFound` if the row is gone
    /// - `DatabaseError` on persistence failure
    async fn update_billing(&self, organization: &Organization) -> Result<(), DomainError>;
}
