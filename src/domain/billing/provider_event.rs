//! Payment provider webhook event types.
//!
//! The envelope carries a type tag and an opaque object. `BillingEvent`
//! decodes that object into one of the fixed payload shapes we act on.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::status::SubscriptionStatus;

/// Webhook event envelope as delivered by the provider.
///
/// Fields of the provider's full schema that we never read are ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEvent {
    /// Unique identifier for the event (`evt_xxx`).
    pub id: String,

    /// Type tag (e.g. `customer.subscription.updated`).
    #[serde(rename = "type")]
    pub event_type: String,

    /// Creation time in Unix seconds.
    #[serde(default)]
    pub created: i64,

    pub data: ProviderEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Container for the type-dependent object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEventData {
    pub object: serde_json::Value,
}

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";

/// A verified event decoded into the payload shape its type tag names.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    CheckoutCompleted(CheckoutSession),
    SubscriptionCreated(ProviderSubscription),
    SubscriptionUpdated(ProviderSubscription),
    SubscriptionDeleted(ProviderSubscription),
    PaymentFailed(ProviderInvoice),
    /// Any type tag we do not act on.
    Other { event_type: String },
}

impl BillingEvent {
    /// Returns the provider type tag this event was decoded from.
    pub fn event_type(&self) -> &str {
        match self {
            BillingEvent::CheckoutCompleted(_) => CHECKOUT_COMPLETED,
            BillingEvent::SubscriptionCreated(_) => SUBSCRIPTION_CREATED,
            BillingEvent::SubscriptionUpdated(_) => SUBSCRIPTION_UPDATED,
            BillingEvent::SubscriptionDeleted(_) => SUBSCRIPTION_DELETED,
            BillingEvent::PaymentFailed(_) => INVOICE_PAYMENT_FAILED,
            BillingEvent::Other { event_type } => event_type,
        }
    }
}

impl ProviderEvent {
    /// Decodes the data object according to the type tag.
    ///
    /// Unknown type tags never fail; their object is not inspected.
    pub fn decode(&self) -> Result<BillingEvent, serde_json::Error> {
        let event = match self.event_type.as_str() {
            CHECKOUT_COMPLETED => BillingEvent::CheckoutCompleted(self.object()?),
            SUBSCRIPTION_CREATED => BillingEvent::SubscriptionCreated(self.object()?),
            SUBSCRIPTION_UPDATED => BillingEvent::SubscriptionUpdated(self.object()?),
            SUBSCRIPTION_DELETED => BillingEvent::SubscriptionDeleted(self.object()?),
            INVOICE_PAYMENT_FAILED => BillingEvent::PaymentFailed(self.object()?),
            other => BillingEvent::Other {
                event_type: other.to_string(),
            },
        };
        Ok(event)
    }

    fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data.object)
    }
}

/// Reference that the provider may send as a bare id or as an expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ExpandableId {
    Id(String),
    Object { id: String },
}

impl ExpandableId {
    pub fn id(&self) -> &str {
        match self {
            ExpandableId::Id(id) => id,
            ExpandableId::Object { id } => id,
        }
    }
}

/// Subscription object carried by `customer.subscription.*` events.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer: ExpandableId,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub items: SubscriptionItems,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub canceled_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<Price>,
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Price {
    pub id: String,
}

impl ProviderSubscription {
    pub fn customer_id(&self) -> &str {
        self.customer.id()
    }

    /// Price id of the first line item, or `""` when there are none.
    pub fn price_id(&self) -> &str {
        self.items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.as_str())
            .unwrap_or("")
    }

    /// Period start, falling back to the first item's period on newer API versions.
    pub fn period_start(&self) -> Option<Timestamp> {
        self.current_period_start
            .or_else(|| self.items.data.first().and_then(|i| i.current_period_start))
            .and_then(Timestamp::from_provider_secs)
    }

    pub fn period_end(&self) -> Option<Timestamp> {
        self.current_period_end
            .or_else(|| self.items.data.first().and_then(|i| i.current_period_end))
            .and_then(Timestamp::from_provider_secs)
    }

    /// Cancellation time, only when the provider reports a nonzero value.
    pub fn canceled_at(&self) -> Option<Timestamp> {
        self.canceled_at.and_then(Timestamp::from_provider_secs)
    }
}

/// Invoice object carried by `invoice.payment_failed`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderInvoice {
    pub id: String,
    #[serde(default)]
    pub customer: Option<ExpandableId>,
    #[serde(default)]
    pub subscription: Option<ExpandableId>,
    #[serde(default)]
    pub parent: Option<InvoiceParent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InvoiceParent {
    #[serde(default)]
    pub subscription_details: Option<SubscriptionDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubscriptionDetails {
    #[serde(default)]
    pub subscription: Option<ExpandableId>,
}

impl ProviderInvoice {
    /// Referenced subscription id, if the invoice carries one.
    ///
    /// Checks the top-level field first, then `parent.subscription_details`.
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription
            .as_ref()
            .or_else(|| {
                self.parent
                    .as_ref()
                    .and_then(|p| p.subscription_details.as_ref())
                    .and_then(|d| d.subscription.as_ref())
            })
            .map(ExpandableId::id)
            .filter(|id| !id.is_empty())
    }
}

/// Checkout session object carried by `checkout.session.completed`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub customer: Option<ExpandableId>,
    #[serde(default)]
    pub subscription: Option<ExpandableId>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Builder for creating test ProviderEvent instances.
#[cfg(test)]
pub struct ProviderEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
}

#[cfg(test)]
impl Default for ProviderEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: SUBSCRIPTION_CREATED.to_string(),
            created: 1_704_067_200,
            object: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl ProviderEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> ProviderEvent {
        ProviderEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: ProviderEventData {
                object: self.object,
            },
            livemode: false,
            api_version: None,
        }
    }
}

/// Subscription object JSON for tests.
#[cfg(test)]
pub fn subscription_json(id: &str, customer: &str, status: &str, price: &str) -> serde_json::Value {
    let items = if price.is_empty() {
        serde_json::json!([])
    } else {
        serde_json::json!([{ "price": { "id": price } }])
    };
    serde_json::json!({
        "id": id,
        "customer": customer,
        "status": status,
        "items": { "data": items },
        "current_period_start": 1_704_067_200,
        "current_period_end": 1_706_745_600,
        "cancel_at_period_end": false,
        "canceled_at": null
    })
}
