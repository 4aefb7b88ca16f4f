//! Resolved owner of a billing customer.

use super::organization::Organization;
use super::user::User;

/// Exactly one local entity bound to an external customer id.
///
/// Only lives for the duration of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    Organization(Organization),
    User(User),
}

impl Owner {
    pub fn kind(&self) -> &'static str {
        match self {
            Owner::Organization(_) => "organization",
            Owner::User(_) => "user",
        }
    }

    /// Id of the owning entity, for log context.
    pub fn id(&self) -> &str {
        match self {
            Owner::Organization(org) => org.id.as_str(),
            Owner::User(user) => user.id.as_str(),
        }
    }
}
