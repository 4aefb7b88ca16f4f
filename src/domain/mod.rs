//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Subscriptions, plan tiers, roles and webhook verification

pub mod billing;
pub mod foundation;
