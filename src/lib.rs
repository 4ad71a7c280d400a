//! Poolstats - in-memory quantile service
//!
//! This library re-exports the pool store from `poolstats-core` and the HTTP
//! API from `poolstats-server`, and owns the service configuration.

pub mod config;

pub use poolstats_core::pool;
pub use poolstats_core::{PoolError, PoolId, PoolStore, PoolSummary, UpsertStatus};
pub use poolstats_core::{SMALL_POOL_LIMIT, VERSION};
pub use poolstats_server as server;
