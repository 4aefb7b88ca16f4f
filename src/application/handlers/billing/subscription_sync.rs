//! SubscriptionSynchronizer - applies provider subscription state locally.
//!
//! Drives the local `Subscription` row through created, updated and deleted
//! events, then fans out to the organization plan or to the user's role and
//! usage limits depending on who owns the subscription.
//!
//! There is no dedup ledger: a repeated `created` is rejected by the unique
//! external id, and repeated updates overwrite with the same values.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::{
    Organization, Owner, PlanMapper, ProviderInvoice, ProviderSubscription, Subscription,
    SubscriptionStatus, SyncError,
};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{
    OrganizationRepository, SubscriptionRepository, UsageLimitService, UserRepository,
};

use super::owner_resolver::OwnerResolver;
use super::role_sync::RoleSynchronizer;
use super::usage_sync::UsageLimitSynchronizer;

/// What a synchronizer call changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created {
        external_subscription_id: String,
        owner: &'static str,
    },
    Updated {
        external_subscription_id: String,
    },
    Canceled {
        external_subscription_id: String,
    },
    MarkedPastDue {
        external_subscription_id: String,
    },
    /// Nothing to do for this payload.
    Ignored { reason: &'static str },
}

pub struct SubscriptionSynchronizer {
    resolver: OwnerResolver,
    subscriptions: Arc<dyn SubscriptionRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    roles: RoleSynchronizer,
    usage: UsageLimitSynchronizer,
    plans: PlanMapper,
}

impl SubscriptionSynchronizer {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        users: Arc<dyn UserRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        usage: Arc<dyn UsageLimitService>,
        plans: PlanMapper,
    ) -> Self {
        Self {
            resolver: OwnerResolver::new(organizations.clone(), users.clone()),
            subscriptions,
            organizations,
            roles: RoleSynchronizer::new(users),
            usage: UsageLimitSynchronizer::new(usage),
            plans,
        }
    }

    /// Handles `customer.subscription.created`.
    pub async fn on_created(
        &self,
        provider: &ProviderSubscription,
    ) -> Result<SyncOutcome, SyncError> {
        let owner = self.resolver.resolve(provider.customer_id()).await?;
        let owner_kind = owner.kind();
        let now = Timestamp::now();

        match owner {
            Owner::Organization(mut org) => {
                let owner_user_id = self
                    .organizations
                    .find_owner_user_id(&org.id)
                    .await?
                    .ok_or_else(|| SyncError::OrganizationOwnerMissing {
                        organization_id: org.id.to_string(),
                    })?;

                let subscription =
                    Subscription::create(owner_user_id, Some(org.id.clone()), provider, now);
                let plan = self.plans.map_plan(&subscription.price_id);
                org.apply_subscription(plan, provider.id.clone(), now);

                self.subscriptions
                    .create_with_organization(&subscription, &org)
                    .await
                    .map_err(|e| duplicate_or_persistence(e, &provider.id))?;

                info!(
                    subscription_id = %provider.id,
                    organization_id = %org.id,
                    plan = %plan,
                    status = %subscription.status,
                    "Organization subscription created"
                );
            }
            Owner::User(user) => {
                let subscription = Subscription::create(user.id.clone(), None, provider, now);

                self.subscriptions
                    .create(&subscription)
                    .await
                    .map_err(|e| duplicate_or_persistence(e, &provider.id))?;

                info!(
                    subscription_id = %provider.id,
                    user_id = %user.id,
                    status = %subscription.status,
                    "User subscription created"
                );

                self.roles
                    .sync(&user.id, Some(&subscription.status))
                    .await?;
                self.usage.sync(&user.id, &subscription.price_id).await;
            }
        }

        Ok(SyncOutcome::Created {
            external_subscription_id: provider.id.clone(),
            owner: owner_kind,
        })
    }

    /// Handles `customer.subscription.updated`.
    ///
    /// Never creates a row: an update for an unknown subscription is dropped.
    pub async fn on_updated(
        &self,
        provider: &ProviderSubscription,
    ) -> Result<SyncOutcome, SyncError> {
        let mut subscription = self.find_existing(&provider.id).await?;
        let now = Timestamp::now();

        subscription.apply_provider_state(provider, now);

        match self.owning_organization(&subscription).await? {
            Some(mut org) => {
                let plan = self.plans.map_plan(&subscription.price_id);
                org.apply_subscription(plan, provider.id.clone(), now);
                self.subscriptions
                    .update_with_organization(&subscription, &org)
                    .await?;

                info!(
                    subscription_id = %provider.id,
                    organization_id = %org.id,
                    plan = %plan,
                    status = %subscription.status,
                    "Organization subscription updated"
                );
            }
            None => {
                self.subscriptions.update(&subscription).await?;

                info!(
                    subscription_id = %provider.id,
                    user_id = %subscription.user_id,
                    status = %subscription.status,
                    "Subscription updated"
                );

                if !subscription.is_organization_owned() {
                    self.roles
                        .sync(&subscription.user_id, Some(&subscription.status))
                        .await?;
                    self.usage
                        .sync(&subscription.user_id, &subscription.price_id)
                        .await;
                }
            }
        }

        Ok(SyncOutcome::Updated {
            external_subscription_id: provider.id.clone(),
        })
    }

    /// Handles `customer.subscription.deleted`.
    ///
    /// The row is kept with status `canceled`.
    pub async fn on_deleted(
        &self,
        provider: &ProviderSubscription,
    ) -> Result<SyncOutcome, SyncError> {
        let mut subscription = self.find_existing(&provider.id).await?;
        let now = Timestamp::now();

        subscription.mark_canceled(now);

        match self.owning_organization(&subscription).await? {
            Some(mut org) => {
                org.reset_to_free(now);
                self.subscriptions
                    .update_with_organization(&subscription, &org)
                    .await?;

                info!(
                    subscription_id = %provider.id,
                    organization_id = %org.id,
                    "Organization subscription canceled, plan reset to free"
                );
            }
            None => {
                self.subscriptions.update(&subscription).await?;

                info!(
                    subscription_id = %provider.id,
                    user_id = %subscription.user_id,
                    "Subscription canceled"
                );

                if !subscription.is_organization_owned() {
                    self.roles
                        .sync(&subscription.user_id, Some(&SubscriptionStatus::Canceled))
                        .await?;
                    self.usage.sync(&subscription.user_id, "").await;
                }
            }
        }

        Ok(SyncOutcome::Canceled {
            external_subscription_id: provider.id.clone(),
        })
    }

    /// Handles `invoice.payment_failed`.
    ///
    /// Invoices without a subscription, or for one we never stored, are ignored.
    pub async fn on_payment_failed(
        &self,
        invoice: &ProviderInvoice,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(external_id) = invoice.subscription_id() else {
            return Ok(SyncOutcome::Ignored {
                reason: "invoice has no subscription",
            });
        };

        let Some(mut subscription) = self.subscriptions.find_by_external_id(external_id).await?
        else {
            return Ok(SyncOutcome::Ignored {
                reason: "subscription not stored locally",
            });
        };

        subscription.mark_past_due(Timestamp::now());
        self.subscriptions.update(&subscription).await?;

        info!(
            subscription_id = %external_id,
            invoice_id = %invoice.id,
            "Subscription marked past due"
        );

        Ok(SyncOutcome::MarkedPastDue {
            external_subscription_id: external_id.to_string(),
        })
    }

    async fn find_existing(&self, external_id: &str) -> Result<Subscription, SyncError> {
        self.subscriptions
            .find_by_external_id(external_id)
            .await?
            .ok_or_else(|| SyncError::SubscriptionNotFound {
                external_subscription_id: external_id.to_string(),
            })
    }

    /// Loads the subscription's organization, if it has one that still exists.
    async fn owning_organization(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<Organization>, SyncError> {
        let Some(org_id) = &subscription.organization_id else {
            return Ok(None);
        };

        let org = self.organizations.find_by_id(org_id).await?;
        if org.is_none() {
            warn!(
                subscription_id = %subscription.external_subscription_id,
                organization_id = %org_id,
                "Organization missing for subscription, updating subscription only"
            );
        }
        Ok(org)
    }
}

fn duplicate_or_persistence(err: DomainError, external_id: &str) -> SyncError {
    if err.is_duplicate() {
        SyncError::DuplicateSubscription {
            external_subscription_id: external_id.to_string(),
        }
    } else {
        SyncError::Persistence(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, InMemoryUsageLimitService};
    use crate::domain::billing::provider_event::subscription_json;
    use crate::domain::billing::{PlanTier, User, UserRole};
    use crate::domain::foundation::{OrganizationId, UserId};
    use serde_json::json;

    // ════════════════════════════════════════════════════════════════════════════
    // Fixtures
    // ════════════════════════════════════════════════════════════════════════════

    struct Fixture {
        store: Arc<InMemoryBillingStore>,
        usage: Arc<InMemoryUsageLimitService>,
        sync: SubscriptionSynchronizer,
    }

    fn fixture_with(usage: InMemoryUsageLimitService) -> Fixture {
        let store = Arc::new(InMemoryBillingStore::new());
        let usage = Arc::new(usage);
        let sync = SubscriptionSynchronizer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            usage.clone(),
            PlanMapper::new("price_pro", "price_enterprise"),
        );
        Fixture { store, usage, sync }
    }

    fn fixture() -> Fixture {
        fixture_with(InMemoryUsageLimitService::new())
    }

    fn user_id(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn org_id() -> OrganizationId {
        OrganizationId::new("org_1").unwrap()
    }

    fn seed_user(store: &InMemoryBillingStore, id: &str, customer: &str, role: UserRole) {
        store.insert_user(User {
            id: user_id(id),
            email: format!("{id}@example.com"),
            role,
            billing_customer_id: Some(customer.to_string()),
            updated_at: Timestamp::now(),
        });
    }

    fn seed_org(store: &InMemoryBillingStore, customer: &str, owner: Option<&str>) {
        store.insert_organization(Organization {
            id: org_id(),
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            plan: PlanTier::Free,
            billing_customer_id: Some(customer.to_string()),
            external_subscription_id: None,
            updated_at: Timestamp::now(),
        });
        if let Some(owner) = owner {
            store.set_organization_owner(org_id(), user_id(owner));
        }
    }

    fn provider(id: &str, customer: &str, status: &str, price: &str) -> ProviderSubscription {
        serde_json::from_value(subscription_json(id, customer, status, price)).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Created
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn created_for_user_stores_row_and_promotes() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);

        let outcome = f
            .sync
            .on_created(&provider("sub_1", "cus_1", "active", "price_pro"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Created {
                external_subscription_id: "sub_1".to_string(),
                owner: "user"
            }
        );
        let rows = f.store.subscriptions();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, SubscriptionStatus::Active);
        assert_eq!(rows[0].price_id, "price_pro");
        assert_eq!(rows[0].user_id, user_id("user_1"));
        assert_eq!(f.store.user(&user_id("user_1")).unwrap().role, UserRole::Premium);
        assert_eq!(f.usage.calls()[0].price_id, "price_pro");
    }

    #[tokio::test]
    async fn created_for_organization_sets_plan_and_pointer() {
        let f = fixture();
        seed_org(&f.store, "cus_org", Some("owner_1"));

        f.sync
            .on_created(&provider("sub_1", "cus_org", "active", "price_enterprise"))
            .await
            .unwrap();

        let org = f.store.organization(&org_id()).unwrap();
        assert_eq!(org.plan, PlanTier::Enterprise);
        assert_eq!(org.external_subscription_id.as_deref(), Some("sub_1"));
        let rows = f.store.subscriptions();
        assert_eq!(rows[0].user_id, user_id("owner_1"));
        assert_eq!(rows[0].organization_id, Some(org_id()));
        assert!(f.usage.calls().is_empty());
    }

    #[tokio::test]
    async fn created_without_line_items_maps_to_free() {
        let f = fixture();
        seed_org(&f.store, "cus_org", Some("owner_1"));

        f.sync
            .on_created(&provider("sub_1", "cus_org", "active", ""))
            .await
            .unwrap();

        assert_eq!(f.store.organization(&org_id()).unwrap().plan, PlanTier::Free);
        assert_eq!(f.store.subscriptions()[0].price_id, "");
    }

    #[tokio::test]
    async fn created_for_organization_without_owner_is_dropped() {
        let f = fixture();
        seed_org(&f.store, "cus_org", None);

        let err = f
            .sync
            .on_created(&provider("sub_1", "cus_org", "active", "price_pro"))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::OrganizationOwnerMissing { .. }));
        assert!(f.store.subscriptions().is_empty());
        assert_eq!(f.store.organization(&org_id()).unwrap().plan, PlanTier::Free);
    }

    #[tokio::test]
    async fn created_for_unknown_customer_is_not_found() {
        let f = fixture();

        let err = f
            .sync
            .on_created(&provider("sub_1", "cus_ghost", "active", "price_pro"))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::CustomerNotFound { .. }));
        assert!(f.store.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn duplicate_created_keeps_one_row() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);
        let event = provider("sub_1", "cus_1", "active", "price_pro");

        f.sync.on_created(&event).await.unwrap();
        let err = f.sync.on_created(&event).await.unwrap_err();

        assert!(err.is_duplicate());
        assert_eq!(f.store.subscriptions().len(), 1);
        assert_eq!(f.store.user(&user_id("user_1")).unwrap().role, UserRole::Premium);
    }

    #[tokio::test]
    async fn created_for_admin_keeps_admin_role() {
        let f = fixture();
        seed_user(&f.store, "admin_1", "cus_admin", UserRole::Admin);

        f.sync
            .on_created(&provider("sub_1", "cus_admin", "active", "price_pro"))
            .await
            .unwrap();

        assert_eq!(f.store.user(&user_id("admin_1")).unwrap().role, UserRole::Admin);
    }

    #[tokio::test]
    async fn usage_failure_does_not_undo_writes() {
        let f = fixture_with(InMemoryUsageLimitService::failing());
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);

        let outcome = f
            .sync
            .on_created(&provider("sub_1", "cus_1", "trialing", "price_pro"))
            .await;

        assert!(outcome.is_ok());
        assert_eq!(f.store.subscriptions().len(), 1);
        assert_eq!(f.store.user(&user_id("user_1")).unwrap().role, UserRole::Premium);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Updated
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn updated_unknown_subscription_does_not_create() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);

        let err = f
            .sync
            .on_updated(&provider("sub_missing", "cus_1", "active", "price_pro"))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SubscriptionNotFound { .. }));
        assert!(f.store.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn updated_user_subscription_overwrites_and_demotes() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);
        f.sync
            .on_created(&provider("sub_1", "cus_1", "active", "price_pro"))
            .await
            .unwrap();

        let mut object = subscription_json("sub_1", "cus_1", "unpaid", "price_other");
        object["cancel_at_period_end"] = json!(true);
        let update: ProviderSubscription = serde_json::from_value(object).unwrap();
        f.sync.on_updated(&update).await.unwrap();

        let row = &f.store.subscriptions()[0];
        assert_eq!(row.status, SubscriptionStatus::Unpaid);
        assert_eq!(row.price_id, "price_other");
        assert!(row.cancel_at_period_end);
        assert_eq!(f.store.user(&user_id("user_1")).unwrap().role, UserRole::User);
        assert_eq!(f.usage.calls().last().unwrap().price_id, "price_other");
    }

    #[tokio::test]
    async fn updated_past_due_keeps_premium() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);
        f.sync
            .on_created(&provider("sub_1", "cus_1", "active", "price_pro"))
            .await
            .unwrap();

        f.sync
            .on_updated(&provider("sub_1", "cus_1", "past_due", "price_pro"))
            .await
            .unwrap();

        assert_eq!(f.store.user(&user_id("user_1")).unwrap().role, UserRole::Premium);
    }

    #[tokio::test]
    async fn updated_organization_subscription_remaps_plan() {
        let f = fixture();
        seed_org(&f.store, "cus_org", Some("owner_1"));
        f.sync
            .on_created(&provider("sub_1", "cus_org", "active", "price_pro"))
            .await
            .unwrap();

        f.sync
            .on_updated(&provider("sub_1", "cus_org", "active", "price_enterprise"))
            .await
            .unwrap();

        assert_eq!(
            f.store.organization(&org_id()).unwrap().plan,
            PlanTier::Enterprise
        );
        assert_eq!(f.store.subscriptions()[0].price_id, "price_enterprise");
    }

    #[tokio::test]
    async fn updated_with_missing_organization_updates_subscription_only() {
        let f = fixture();
        seed_user(&f.store, "owner_1", "cus_owner", UserRole::User);
        seed_org(&f.store, "cus_org", Some("owner_1"));
        f.sync
            .on_created(&provider("sub_1", "cus_org", "active", "price_pro"))
            .await
            .unwrap();
        f.store.remove_organization(&org_id());

        f.sync
            .on_updated(&provider("sub_1", "cus_org", "canceled", "price_pro"))
            .await
            .unwrap();

        assert_eq!(f.store.subscriptions()[0].status, SubscriptionStatus::Canceled);
        assert_eq!(f.store.user(&user_id("owner_1")).unwrap().role, UserRole::User);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Deleted
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn deleted_organization_subscription_resets_to_free() {
        let f = fixture();
        seed_org(&f.store, "cus_org", Some("owner_1"));
        f.sync
            .on_created(&provider("sub_1", "cus_org", "active", "price_enterprise"))
            .await
            .unwrap();

        f.sync
            .on_deleted(&provider("sub_1", "cus_org", "canceled", "price_enterprise"))
            .await
            .unwrap();

        let org = f.store.organization(&org_id()).unwrap();
        assert_eq!(org.plan, PlanTier::Free);
        assert!(org.external_subscription_id.is_none());
        assert_eq!(org.name, "Acme");
        assert_eq!(org.slug, "acme");
        let row = &f.store.subscriptions()[0];
        assert_eq!(row.status, SubscriptionStatus::Canceled);
        assert!(row.canceled_at.is_some());
    }

    #[tokio::test]
    async fn deleted_user_subscription_demotes_and_clears_limits() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);
        f.sync
            .on_created(&provider("sub_1", "cus_1", "active", "price_pro"))
            .await
            .unwrap();

        f.sync
            .on_deleted(&provider("sub_1", "cus_1", "active", "price_pro"))
            .await
            .unwrap();

        assert_eq!(f.store.subscriptions().len(), 1);
        assert_eq!(f.store.subscriptions()[0].status, SubscriptionStatus::Canceled);
        assert_eq!(f.store.user(&user_id("user_1")).unwrap().role, UserRole::User);
        assert_eq!(f.usage.calls().last().unwrap().price_id, "");
    }

    #[tokio::test]
    async fn deleted_unknown_subscription_changes_nothing() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::Premium);

        let err = f
            .sync
            .on_deleted(&provider("sub_missing", "cus_1", "canceled", "price_pro"))
            .await
            .unwrap_err();

        assert!(err.is_resolution());
        assert!(f.store.subscriptions().is_empty());
        assert_eq!(f.store.user(&user_id("user_1")).unwrap().role, UserRole::Premium);
    }

    #[tokio::test]
    async fn persistence_failure_is_reported() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);
        f.sync
            .on_created(&provider("sub_1", "cus_1", "active", "price_pro"))
            .await
            .unwrap();
        f.store.set_fail_writes(true);

        let err = f
            .sync
            .on_deleted(&provider("sub_1", "cus_1", "canceled", "price_pro"))
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Persistence(_)));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Payment Failed
    // ════════════════════════════════════════════════════════════════════════════

    fn invoice(value: serde_json::Value) -> ProviderInvoice {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn payment_failed_marks_past_due() {
        let f = fixture();
        seed_user(&f.store, "user_1", "cus_1", UserRole::User);
        f.sync
            .on_created(&provider("sub_1", "cus_1", "active", "price_pro"))
            .await
            .unwrap();

        let outcome = f
            .sync
            .on_payment_failed(&invoice(json!({ "id": "in_1", "subscription": "sub_1" })))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::MarkedPastDue {
                external_subscription_id: "sub_1".to_string()
            }
        );
        assert_eq!(f.store.subscriptions()[0].status, SubscriptionStatus::PastDue);
    }

    #[tokio::test]
    async fn payment_failed_without_subscription_is_ignored() {
        let f = fixture();

        let outcome = f
            .sync
            .on_payment_failed(&invoice(json!({ "id": "in_1", "customer": "cus_1" })))
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Ignored { .. }));
    }

    #[tokio::test]
    async fn payment_failed_for_unknown_subscription_is_ignored() {
        let f = fixture();

        let outcome = f
            .sync
            .on_payment_failed(&invoice(json!({ "id": "in_1", "subscription": "sub_x" })))
            .await
            .unwrap();

        assert!(matches!(outcome, SyncOutcome::Ignored { .. }));
        assert!(f.store.subscriptions().is_empty());
    }
}
