//! In-memory billing store.
//!
//! One `Mutex`-guarded state implements the organization, user and
//! subscription ports together, so the atomic `*_with_organization` writes
//! behave like a single transaction. Useful for:
//! - Unit and HTTP tests
//! - Local development without PostgreSQL
//!
//! Enforces the same unique external subscription id as the SQL schema.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::billing::{Organization, Subscription, User, UserRole};
use crate::domain::foundation::{DomainError, ErrorCode, OrganizationId, Timestamp, UserId};
use crate::ports::{OrganizationRepository, SubscriptionRepository, UserRepository};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    organizations: HashMap<OrganizationId, Organization>,
    organization_owners: HashMap<OrganizationId, UserId>,
    subscriptions: Vec<Subscription>,
    fail_writes: bool,
}

impl State {
    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes {
            return Err(DomainError::database("simulated write failure"));
        }
        Ok(())
    }

    fn insert_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        let exists = self
            .subscriptions
            .iter()
            .any(|s| s.external_subscription_id == subscription.external_subscription_id);
        if exists {
            return Err(DomainError::new(
                ErrorCode::DuplicateSubscription,
                "Subscription already exists",
            )
            .with_detail(
                "external_subscription_id",
                subscription.external_subscription_id.clone(),
            ));
        }
        self.subscriptions.push(subscription.clone());
        Ok(())
    }

    fn subscription_slot(
        &mut self,
        subscription: &Subscription,
    ) -> Result<&mut Subscription, DomainError> {
        self.subscriptions
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::SubscriptionNotFound, "Subscription not found")
            })
    }

    fn organization_slot(
        &mut self,
        organization: &Organization,
    ) -> Result<&mut Organization, DomainError> {
        self.organizations
            .get_mut(&organization.id)
            .ok_or_else(|| {
                DomainError::new(ErrorCode::OrganizationNotFound, "Organization not found")
            })
    }
}

/// Copies only the billing columns, as the SQL adapter does.
fn write_billing_fields(target: &mut Organization, source: &Organization) {
    target.plan = source.plan;
    target.external_subscription_id = source.external_subscription_id.clone();
    target.updated_at = source.updated_at;
}

/// In-memory implementation of the billing repository ports.
///
/// Thread-safe via internal `Mutex`. Does not persist data across restarts.
#[derive(Default)]
pub struct InMemoryBillingStore {
    state: Mutex<State>,
}

impl InMemoryBillingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, DomainError> {
        self.state
            .lock()
            .map_err(|_| DomainError::new(ErrorCode::InternalError, "billing store lock poisoned"))
    }

    fn lock_for_inspection(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_user(&self, user: User) {
        self.lock_for_inspection().users.insert(user.id.clone(), user);
    }

    pub fn insert_organization(&self, organization: Organization) {
        self.lock_for_inspection()
            .organizations
            .insert(organization.id.clone(), organization);
    }

    /// Records `user_id` as holding the owner role in the organization.
    pub fn set_organization_owner(&self, organization_id: OrganizationId, user_id: UserId) {
        self.lock_for_inspection()
            .organization_owners
            .insert(organization_id, user_id);
    }

    pub fn remove_organization(&self, organization_id: &OrganizationId) {
        self.lock_for_inspection().organizations.remove(organization_id);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.lock_for_inspection().subscriptions.push(subscription);
    }

    /// Makes every subsequent write fail with a database error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock_for_inspection().fail_writes = fail;
    }

    pub fn user(&self, id: &UserId) -> Option<User> {
        self.lock_for_inspection().users.get(id).cloned()
    }

    pub fn organization(&self, id: &OrganizationId) -> Option<Organization> {
        self.lock_for_inspection().organizations.get(id).cloned()
    }

    /// Returns all subscription rows in insertion order.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.lock_for_inspection().subscriptions.clone()
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryBillingStore {
    async fn find_by_billing_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<Organization>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .organizations
            .values()
            .find(|o| o.billing_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn find_by_id(&self, id: &OrganizationId) -> Result<Option<Organization>, DomainError> {
        Ok(self.lock()?.organizations.get(id).cloned())
    }

    async fn find_owner_user_id(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Option<UserId>, DomainError> {
        Ok(self.lock()?.organization_owners.get(organization_id).cloned())
    }

    async fn update_billing(&self, organization: &Organization) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let slot = state.organization_slot(organization)?;
        write_billing_fields(slot, organization);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryBillingStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn find_by_billing_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .users
            .values()
            .find(|u| u.billing_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn update_role(
        &self,
        id: &UserId,
        role: UserRole,
        updated_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| DomainError::new(ErrorCode::UserNotFound, "User not found"))?;
        user.role = role;
        user.updated_at = updated_at;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryBillingStore {
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.lock()?;
        Ok(state
            .subscriptions
            .iter()
            .find(|s| s.external_subscription_id == external_subscription_id)
            .cloned())
    }

    async fn create(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        state.insert_subscription(subscription)
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        *state.subscription_slot(subscription)? = subscription.clone();
        Ok(())
    }

    async fn create_with_organization(
        &self,
        subscription: &Subscription,
        organization: &Organization,
    ) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        state.organization_slot(organization)?;
        state.insert_subscription(subscription)?;
        let slot = state.organization_slot(organization)?;
        write_billing_fields(slot, organization);
        Ok(())
    }

    async fn update_with_organization(
        &self,
        subscription: &Subscription,
        organization: &Organization,
    ) -> Result<(), DomainError> {
        let mut state = self.lock()?;
        state.check_writable()?;
        state.organization_slot(organization)?;
        *state.subscription_slot(subscription)? = subscription.clone();
        let slot = state.organization_slot(organization)?;
        write_billing_fields(slot, organization);
        Ok(())
    }
}
