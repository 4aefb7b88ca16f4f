//! Subscription entity.
//!
//! One row per provider subscription. Rows are never deleted; a provider
//! deletion forces the status to `canceled` and keeps the row for history.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrganizationId, SubscriptionId, Timestamp, UserId};

use super::provider_event::ProviderSubscription;
use super::status::SubscriptionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    /// Always populated. For organization billing this is the organization owner.
    pub user_id: UserId,
    pub organization_id: Option<OrganizationId>,
    /// Unique across all rows.
    pub external_subscription_id: String,
    pub price_id: String,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Builds a new row from the provider's subscription object.
    pub fn create(
        user_id: UserId,
        organization_id: Option<OrganizationId>,
        provider: &ProviderSubscription,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            organization_id,
            external_subscription_id: provider.id.clone(),
            price_id: provider.price_id().to_string(),
            status: provider.status.clone(),
            current_period_start: provider.period_start(),
            current_period_end: provider.period_end(),
            cancel_at_period_end: provider.cancel_at_period_end,
            canceled_at: provider.canceled_at(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites mutable fields with the provider's current view.
    ///
    /// `canceled_at` is only replaced when the provider reports one.
    pub fn apply_provider_state(&mut self, provider: &ProviderSubscription, now: Timestamp) {
        self.status = provider.status.clone();
        self.price_id = provider.price_id().to_string();
        self.current_period_start = provider.period_start();
        self.current_period_end = provider.period_end();
        self.cancel_at_period_end = provider.cancel_at_period_end;
        if let Some(canceled_at) = provider.canceled_at() {
            self.canceled_at = Some(canceled_at);
        }
        self.updated_at = now;
    }

    pub fn mark_canceled(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::Canceled;
        self.canceled_at = Some(now);
        self.updated_at = now;
    }

    pub fn mark_past_due(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::PastDue;
        self.updated_at = now;
    }

    pub fn is_organization_owned(&self) -> bool {
        self.organization_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::provider_event::subscription_json;

    fn provider(status: &str, price: &str) -> ProviderSubscription {
        serde_json::from_value(subscription_json("sub_1", "cus_1", status, price)).unwrap()
    }

    fn user() -> UserId {
        UserId::new("user_1").unwrap()
    }

    #[test]
    fn create_copies_provider_fields() {
        let now = Timestamp::now();
        let sub = Subscription::create(user(), None, &provider("active", "price_pro"), now);

        assert_eq!(sub.external_subscription_id, "sub_1");
        assert_eq!(sub.price_id, "price_pro");
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.current_period_start.unwrap().as_unix_secs(), 1_704_067_200);
        assert!(sub.canceled_at.is_none());
        assert!(!sub.is_organization_owned());
    }

    #[test]
    fn apply_keeps_canceled_at_when_provider_reports_none() {
        let now = Timestamp::now();
        let mut sub = Subscription::create(user(), None, &provider("active", "price_pro"), now);
        let earlier = Timestamp::from_provider_secs(1_000).unwrap();
        sub.canceled_at = Some(earlier);

        sub.apply_provider_state(&provider("active", "price_enterprise"), now);

        assert_eq!(sub.canceled_at, Some(earlier));
        assert_eq!(sub.price_id, "price_enterprise");
    }

    #[test]
    fn apply_overwrites_canceled_at_when_reported() {
        let now = Timestamp::now();
        let mut sub = Subscription::create(user(), None, &provider("active", "price_pro"), now);
        let mut object = subscription_json("sub_1", "cus_1", "canceled", "price_pro");
        object["canceled_at"] = serde_json::json!(1_705_000_000);
        object["cancel_at_period_end"] = serde_json::json!(true);
        let update: ProviderSubscription = serde_json::from_value(object).unwrap();

        sub.apply_provider_state(&update, now);

        assert_eq!(sub.canceled_at.unwrap().as_unix_secs(), 1_705_000_000);
        assert!(sub.cancel_at_period_end);
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
    }

    #[test]
    fn mark_canceled_stamps_time() {
        let now = Timestamp::now();
        let mut sub = Subscription::create(user(), None, &provider("active", "price_pro"), now);

        sub.mark_canceled(now);

        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert_eq!(sub.canceled_at, Some(now));
    }

    #[test]
    fn mark_past_due_only_changes_status() {
        let now = Timestamp::now();
        let mut sub = Subscription::create(user(), None, &provider("active", "price_pro"), now);

        sub.mark_past_due(now);

        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(sub.price_id, "price_pro");
        assert!(sub.canceled_at.is_none());
    }
}
