//! Poolstats Core - Pool storage and quantile computation
//!
//! This library holds numeric observations in named pools and answers
//! nearest-rank quantile queries over a pool's current contents. All state
//! lives in memory for the lifetime of the owning [`PoolStore`].

pub mod pool;

pub use pool::store::{PoolError, PoolId, PoolStore, PoolSummary, UpsertStatus};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest pool size answered by a full sort; bigger pools use selection
pub const SMALL_POOL_LIMIT: usize = 100;
