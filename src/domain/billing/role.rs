//! User access roles and the billing-driven role transition.

use serde::{Deserialize, Serialize};

use super::status::SubscriptionStatus;

/// Ordered access role: `User < Premium < Admin < SuperAdmin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Premium,
    Admin,
    SuperAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Premium => "premium",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super_admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "premium" => Some(UserRole::Premium),
            "admin" => Some(UserRole::Admin),
            "super_admin" | "superadmin" => Some(UserRole::SuperAdmin),
            _ => None,
        }
    }

    /// Operator-assigned roles that billing state never touches.
    pub fn is_protected(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Computes the role a user should hold given a subscription status.
///
/// Returns `None` when no write is needed: the role is protected or already
/// equals the target.
pub fn role_after_sync(
    current: UserRole,
    status: Option<&SubscriptionStatus>,
) -> Option<UserRole> {
    if current.is_protected() {
        return None;
    }

    let target = match status {
        Some(status) if status.grants_premium() => UserRole::Premium,
        _ => UserRole::User,
    };

    (target != current).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn roles_are_ordered() {
        assert!(UserRole::SuperAdmin > UserRole::Admin);
        assert!(UserRole::Admin > UserRole::Premium);
        assert!(UserRole::Premium > UserRole::User);
    }

    #[test]
    fn active_user_becomes_premium() {
        assert_eq!(
            role_after_sync(UserRole::User, Some(&SubscriptionStatus::Active)),
            Some(UserRole::Premium)
        );
    }

    #[test]
    fn trialing_user_becomes_premium() {
        assert_eq!(
            role_after_sync(UserRole::User, Some(&SubscriptionStatus::Trialing)),
            Some(UserRole::Premium)
        );
    }

    #[test]
    fn past_due_premium_keeps_role_without_write() {
        assert_eq!(
            role_after_sync(UserRole::Premium, Some(&SubscriptionStatus::PastDue)),
            None
        );
    }

    #[test]
    fn canceled_premium_becomes_user() {
        assert_eq!(
            role_after_sync(UserRole::Premium, Some(&SubscriptionStatus::Canceled)),
            Some(UserRole::User)
        );
    }

    #[test]
    fn absent_status_demotes_premium() {
        assert_eq!(role_after_sync(UserRole::Premium, None), Some(UserRole::User));
    }

    #[test]
    fn admin_is_never_changed() {
        assert_eq!(role_after_sync(UserRole::Admin, Some(&SubscriptionStatus::Canceled)), None);
        assert_eq!(role_after_sync(UserRole::SuperAdmin, None), None);
    }

    #[test]
    fn parse_round_trips() {
        for role in [
            UserRole::User,
            UserRole::Premium,
            UserRole::Admin,
            UserRole::SuperAdmin,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }

    fn any_status() -> impl Strategy<Value = SubscriptionStatus> {
        prop_oneof![
            Just(SubscriptionStatus::Active),
            Just(SubscriptionStatus::Trialing),
            Just(SubscriptionStatus::PastDue),
            Just(SubscriptionStatus::Canceled),
            Just(SubscriptionStatus::Unpaid),
            Just(SubscriptionStatus::Incomplete),
            "[a-z_]{1,12}".prop_map(|s| SubscriptionStatus::parse(&s)),
        ]
    }

    proptest! {
        #[test]
        fn protected_roles_survive_any_status_sequence(
            start in prop_oneof![Just(UserRole::Admin), Just(UserRole::SuperAdmin)],
            statuses in prop::collection::vec(prop::option::of(any_status()), 0..20),
        ) {
            let mut role = start;
            for status in &statuses {
                if let Some(next) = role_after_sync(role, status.as_ref()) {
                    role = next;
                }
            }
            prop_assert_eq!(role, start);
        }

        #[test]
        fn unprotected_role_tracks_status(
            start in prop_oneof![Just(UserRole::User), Just(UserRole::Premium)],
            status in any_status(),
        ) {
            let role = role_after_sync(start, Some(&status)).unwrap_or(start);
            let expected = if status.grants_premium() { UserRole::Premium } else { UserRole::User };
            prop_assert_eq!(role, expected);
        }
    }
}
