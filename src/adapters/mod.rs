//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing domain to external systems:
//! - `http` - axum routes for the webhook and health endpoints
//! - `memory` - In-memory repositories for tests and local development
//! - `postgres` - PostgreSQL repositories
//! - `usage` - Usage-metering clients

pub mod http;
pub mod memory;
pub mod postgres;
pub mod usage;
