//! User repository port.

use async_trait::async_trait;

use crate::domain::billing::{User, UserRole};
use crate::domain::foundation::{DomainError, Timestamp, UserId};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError>;

    /// Find the user bound to an external billing customer id.
    async fn find_by_billing_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, DomainError>;

    /// Write a new role.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user is gone
    /// - `DatabaseError` on persistence failure
    async fn update_role(
        &self,
        id: &UserId,
        role: UserRole,
        updated_at: Timestamp,
    ) -> Result<(), DomainError>;
}
