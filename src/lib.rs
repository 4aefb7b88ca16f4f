//! Billing Sync - Payment provider webhook ingestion
//!
//! Receives signed subscription events from the payment provider and keeps
//! local subscriptions, organization plans, user roles and usage quotas in
//! step with them.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod observability;
pub mod ports;
