//! Organization billing view.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OrganizationId, Timestamp};

use super::plan::PlanTier;

/// Membership role whose holder is used as the subscription's user.
pub const OWNER_ROLE: &str = "owner";

/// The slice of an organization that billing reads and writes.
///
/// `plan` is only ever derived from the active subscription's price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub slug: String,
    pub plan: PlanTier,
    pub billing_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub updated_at: Timestamp,
}

impl Organization {
    pub fn apply_subscription(
        &mut self,
        plan: PlanTier,
        external_subscription_id: impl Into<String>,
        now: Timestamp,
    ) {
        self.plan = plan;
        self.external_subscription_id = Some(external_subscription_id.into());
        self.updated_at = now;
    }

    /// Resets to the free plan and drops the subscription pointer.
    pub fn reset_to_free(&mut self, now: Timestamp) {
        self.plan = PlanTier::Free;
        self.external_subscription_id = None;
        self.updated_at = now;
    }
}
