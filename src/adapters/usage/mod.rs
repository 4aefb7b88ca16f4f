//! Usage-metering adapters.

mod http_usage_limit_service;
mod noop_usage_limit_service;

pub use http_usage_limit_service::HttpUsageLimitService;
pub use noop_usage_limit_service::NoopUsageLimitService;
