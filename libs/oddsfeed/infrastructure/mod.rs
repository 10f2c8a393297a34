//! Infrastructure Layer
//!
//! Outside-world adapters: the provider's HTTP API, environments,
//! configuration, logging and the shared caches used by the stages.

pub mod api;
pub mod config;
pub mod environment;
pub mod expiring_map;
pub mod logging;
pub mod rate_limit;
pub mod shutdown;

pub use api::{FeedApi, HttpApi};
pub use config::{ConfigError, RecoverySeed, SdkConfig};
pub use environment::Environment;
pub use expiring_map::ExpiringMap;
pub use logging::{init_tracing, init_tracing_with_level};
pub use rate_limit::{RateLimiter, DEFAULT_CONCURRENT_API_CALLS};
pub use shutdown::ShutdownManager;
