//! EventDispatcher - routes verified events to the synchronizer.
//!
//! Every outcome, including failures, becomes a `DispatchOutcome`. Errors are
//! logged here with the event's ids and never propagated, so the delivery is
//! always acknowledged once it has been authenticated.

use tracing::{debug, error, info, warn};

use crate::domain::billing::{BillingEvent, ProviderEvent, SyncError};

use super::subscription_sync::{SubscriptionSynchronizer, SyncOutcome};

/// Result of dispatching one authentic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The synchronizer ran to completion.
    Applied(SyncOutcome),
    /// Logged only; state arrives with the follow-up subscription events.
    Acknowledged,
    /// Unrecognized event type.
    Ignored { event_type: String },
    /// Resolution, duplicate or persistence failure, already logged.
    Dropped { reason: String },
}

pub struct EventDispatcher {
    synchronizer: SubscriptionSynchronizer,
}

impl EventDispatcher {
    pub fn new(synchronizer: SubscriptionSynchronizer) -> Self {
        Self { synchronizer }
    }

    pub async fn dispatch(&self, envelope: &ProviderEvent, event: BillingEvent) -> DispatchOutcome {
        let result = match &event {
            BillingEvent::CheckoutCompleted(session) => {
                info!(
                    event_id = %envelope.id,
                    session_id = %session.id,
                    customer_id = session.customer.as_ref().map(|c| c.id()).unwrap_or_default(),
                    "Checkout completed"
                );
                return DispatchOutcome::Acknowledged;
            }
            BillingEvent::SubscriptionCreated(sub) => self.synchronizer.on_created(sub).await,
            BillingEvent::SubscriptionUpdated(sub) => self.synchronizer.on_updated(sub).await,
            BillingEvent::SubscriptionDeleted(sub) => self.synchronizer.on_deleted(sub).await,
            BillingEvent::PaymentFailed(invoice) => {
                self.synchronizer.on_payment_failed(invoice).await
            }
            BillingEvent::Other { event_type } => {
                debug!(event_id = %envelope.id, event_type = %event_type, "Unhandled event type");
                return DispatchOutcome::Ignored {
                    event_type: event_type.clone(),
                };
            }
        };

        match result {
            Ok(SyncOutcome::Ignored { reason }) => {
                info!(
                    event_id = %envelope.id,
                    event_type = %event.event_type(),
                    reason,
                    "Event required no changes"
                );
                DispatchOutcome::Applied(SyncOutcome::Ignored { reason })
            }
            Ok(outcome) => DispatchOutcome::Applied(outcome),
            Err(err) => {
                log_sync_error(envelope, &event, &err);
                DispatchOutcome::Dropped {
                    reason: err.to_string(),
                }
            }
        }
    }
}

fn log_sync_error(envelope: &ProviderEvent, event: &BillingEvent, err: &SyncError) {
    let event_type = event.event_type();
    if err.is_duplicate() {
        warn!(
            event_id = %envelope.id,
            event_type = %event_type,
            error = %err,
            "Duplicate delivery ignored"
        );
    } else if err.is_resolution() {
        error!(
            event_id = %envelope.id,
            event_type = %event_type,
            error = %err,
            "Event references unknown local data, dropping"
        );
    } else {
        error!(
            event_id = %envelope.id,
            event_type = %event_type,
            error = %err,
            "Failed to apply billing event, dropping"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, InMemoryUsageLimitService};
    use crate::domain::billing::provider_event::{
        subscription_json, ProviderEventBuilder, CHECKOUT_COMPLETED, INVOICE_PAYMENT_FAILED,
        SUBSCRIPTION_CREATED, SUBSCRIPTION_DELETED,
    };
    use crate::domain::billing::{PlanMapper, User, UserRole};
    use crate::domain::foundation::{Timestamp, UserId};
    use serde_json::json;
    use std::sync::Arc;

    fn dispatcher() -> (EventDispatcher, Arc<InMemoryBillingStore>) {
        let store = Arc::new(InMemoryBillingStore::new());
        let sync = SubscriptionSynchronizer::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(InMemoryUsageLimitService::new()),
            PlanMapper::new("price_pro", "price_enterprise"),
        );
        (EventDispatcher::new(sync), store)
    }

    async fn run(dispatcher: &EventDispatcher, envelope: ProviderEvent) -> DispatchOutcome {
        let event = envelope.decode().unwrap();
        dispatcher.dispatch(&envelope, event).await
    }

    #[tokio::test]
    async fn checkout_is_acknowledged_without_writes() {
        let (dispatcher, store) = dispatcher();
        let envelope = ProviderEventBuilder::new()
            .event_type(CHECKOUT_COMPLETED)
            .object(json!({ "id": "cs_1", "customer": "cus_1", "subscription": "sub_1" }))
            .build();

        assert_eq!(run(&dispatcher, envelope).await, DispatchOutcome::Acknowledged);
        assert!(store.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn unknown_type_is_ignored() {
        let (dispatcher, _) = dispatcher();
        let envelope = ProviderEventBuilder::new()
            .event_type("customer.discount.created")
            .build();

        assert_eq!(
            run(&dispatcher, envelope).await,
            DispatchOutcome::Ignored {
                event_type: "customer.discount.created".to_string()
            }
        );
    }

    #[tokio::test]
    async fn created_is_applied() {
        let (dispatcher, store) = dispatcher();
        store.insert_user(User {
            id: UserId::new("user_1").unwrap(),
            email: "user_1@example.com".to_string(),
            role: UserRole::User,
            billing_customer_id: Some("cus_1".to_string()),
            updated_at: Timestamp::now(),
        });
        let envelope = ProviderEventBuilder::new()
            .event_type(SUBSCRIPTION_CREATED)
            .object(subscription_json("sub_1", "cus_1", "active", "price_pro"))
            .build();

        let outcome = run(&dispatcher, envelope).await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Applied(SyncOutcome::Created { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_created_deliveries_leave_one_row() {
        let (dispatcher, store) = dispatcher();
        store.insert_user(User {
            id: UserId::new("user_1").unwrap(),
            email: "user_1@example.com".to_string(),
            role: UserRole::User,
            billing_customer_id: Some("cus_1".to_string()),
            updated_at: Timestamp::now(),
        });
        let dispatcher = Arc::new(dispatcher);

        let deliver = |event_id: &'static str| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let envelope = ProviderEventBuilder::new()
                    .id(event_id)
                    .event_type(SUBSCRIPTION_CREATED)
                    .object(subscription_json("sub_1", "cus_1", "active", "price_pro"))
                    .build();
                run(&dispatcher, envelope).await
            })
        };
        let (first, second) = tokio::join!(deliver("evt_1"), deliver("evt_2"));
        let outcomes = [first.unwrap(), second.unwrap()];

        let created = outcomes
            .iter()
            .filter(|o| matches!(o, DispatchOutcome::Applied(SyncOutcome::Created { .. })))
            .count();
        let duplicates = outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    DispatchOutcome::Dropped { reason } if reason.contains("already exists")
                )
            })
            .count();

        assert_eq!(created, 1);
        assert_eq!(duplicates, 1);
        assert_eq!(store.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn resolution_failure_is_dropped() {
        let (dispatcher, store) = dispatcher();
        let envelope = ProviderEventBuilder::new()
            .event_type(SUBSCRIPTION_DELETED)
            .object(subscription_json("sub_missing", "cus_1", "canceled", "price_pro"))
            .build();

        let outcome = run(&dispatcher, envelope).await;

        assert!(matches!(outcome, DispatchOutcome::Dropped { .. }));
        assert!(store.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn invoice_without_subscription_is_applied_as_ignored() {
        let (dispatcher, _) = dispatcher();
        let envelope = ProviderEventBuilder::new()
            .event_type(INVOICE_PAYMENT_FAILED)
            .object(json!({ "id": "in_1" }))
            .build();

        assert!(matches!(
            run(&dispatcher, envelope).await,
            DispatchOutcome::Applied(SyncOutcome::Ignored { .. })
        ));
    }
}
