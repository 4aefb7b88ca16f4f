//! RoleSynchronizer - keeps a user's access role in line with billing state.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::billing::{role_after_sync, SubscriptionStatus, SyncError, UserRole};
use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::UserRepository;

/// What a role sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    /// The user no longer exists locally.
    UserMissing,
    /// Admin or super-admin; left alone.
    Protected(UserRole),
    /// Already at the target role; nothing written.
    Unchanged(UserRole),
    Changed { from: UserRole, to: UserRole },
}

pub struct RoleSynchronizer {
    users: Arc<dyn UserRepository>,
}

impl RoleSynchronizer {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Applies the role implied by `status` unless the role is protected.
    ///
    /// A missing user is logged and reported as `UserMissing`, not an error.
    pub async fn sync(
        &self,
        user_id: &UserId,
        status: Option<&SubscriptionStatus>,
    ) -> Result<RoleChange, SyncError> {
        let Some(user) = self.users.find_by_id(user_id).await? else {
            warn!(user_id = %user_id, "User not found during role sync");
            return Ok(RoleChange::UserMissing);
        };

        if user.role.is_protected() {
            return Ok(RoleChange::Protected(user.role));
        }

        let Some(target) = role_after_sync(user.role, status) else {
            return Ok(RoleChange::Unchanged(user.role));
        };

        self.users
            .update_role(user_id, target, Timestamp::now())
            .await?;

        info!(
            user_id = %user_id,
            from = %user.role,
            to = %target,
            "User role synchronized"
        );

        Ok(RoleChange::Changed {
            from: user.role,
            to: target,
        })
    }
}
