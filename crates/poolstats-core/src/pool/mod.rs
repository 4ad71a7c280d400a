//! Pool module
//!
//! - Concurrent pool storage with append-or-create semantics ([`store`])
//! - Nearest-rank quantile strategies ([`quantile`])

pub mod quantile;
pub mod store;
