//! Concurrent in-memory pool storage
//!
//! Pools are kept in a sharded map so that writers to different pools do not
//! contend on a single lock. Every read copies the pool out under the shard
//! lock and computes on the copy, so a quantile never observes a half-applied
//! append.

use crate::pool::quantile;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pool identifier
///
/// Signed 64-bit: ids outside `i64::MIN..=i64::MAX` are rejected at the API
/// boundary rather than wrapped or truncated.
pub type PoolId = i64;

/// Errors returned by pool queries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("Pool not found: {0}")]
    NotFound(PoolId),

    #[error("Percentile must be in the range (0, 100], got {0}")]
    InvalidArgument(f64),

    #[error("Pool {0} is empty")]
    OutOfRange(PoolId),
}

/// Outcome of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertStatus {
    /// The pool did not exist and was created
    Inserted,
    /// Values were appended to an existing pool
    Appended,
}

/// Quantile and size taken from one snapshot of a pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSummary {
    /// Nearest-rank quantile value
    pub quantile: f64,
    /// Number of observations the quantile was computed from
    pub total_count: usize,
}

/// Store of all pools, keyed by [`PoolId`]
///
/// Shared between request handlers behind an `Arc`; all methods take `&self`.
#[derive(Debug, Default)]
pub struct PoolStore {
    pools: DashMap<PoolId, Vec<f64>>,
}

impl PoolStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
        }
    }

    /// Check whether a pool exists
    pub fn contains(&self, pool_id: PoolId) -> bool {
        self.pools.contains_key(&pool_id)
    }

    /// Create the pool with `values`, or append `values` to it if it exists.
    ///
    /// The existence check and the write happen under the same shard lock, so
    /// concurrent first upserts to one id report exactly one
    /// [`UpsertStatus::Inserted`].
    ///
    /// # Arguments
    /// * `pool_id` - Target pool
    /// * `values` - Observations in the order they should be stored
    pub fn upsert(&self, pool_id: PoolId, values: Vec<f64>) -> UpsertStatus {
        match self.pools.entry(pool_id) {
            Entry::Occupied(mut entry) => {
                let pool = entry.get_mut();
                pool.extend(values);
                tracing::debug!(pool_id, len = pool.len(), "Appended to pool");
                UpsertStatus::Appended
            }
            Entry::Vacant(entry) => {
                let len = values.len();
                entry.insert(values);
                tracing::info!(pool_id, len, "Created pool");
                UpsertStatus::Inserted
            }
        }
    }

    /// Nearest-rank quantile of the pool's current contents
    ///
    /// # Errors
    /// * [`PoolError::InvalidArgument`] if `percentile` is not in `(0, 100]`
    /// * [`PoolError::NotFound`] if the pool does not exist
    /// * [`PoolError::OutOfRange`] if the pool is empty
    pub fn quantile(&self, pool_id: PoolId, percentile: f64) -> Result<f64, PoolError> {
        self.query(pool_id, percentile).map(|s| s.quantile)
    }

    /// Number of observations in the pool
    pub fn len(&self, pool_id: PoolId) -> Result<usize, PoolError> {
        self.pools
            .get(&pool_id)
            .map(|pool| pool.value().len())
            .ok_or(PoolError::NotFound(pool_id))
    }

    /// Quantile together with the pool size it was computed from
    ///
    /// Fails the same way as [`PoolStore::quantile`].
    pub fn query(&self, pool_id: PoolId, percentile: f64) -> Result<PoolSummary, PoolError> {
        check_percentile(percentile)?;

        // Copy under the read lock, compute after it is released
        let mut snapshot = self.values(pool_id).ok_or(PoolError::NotFound(pool_id))?;
        let total_count = snapshot.len();

        let quantile = quantile::nearest_rank(&mut snapshot, percentile)
            .ok_or(PoolError::OutOfRange(pool_id))?;

        tracing::debug!(pool_id, percentile, quantile, total_count, "Quantile query");
        Ok(PoolSummary {
            quantile,
            total_count,
        })
    }

    /// Copy of the pool's observations in insertion order
    pub fn values(&self, pool_id: PoolId) -> Option<Vec<f64>> {
        self.pools.get(&pool_id).map(|pool| pool.value().clone())
    }

    /// Number of pools in the store
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }
}

fn check_percentile(percentile: f64) -> Result<(), PoolError> {
    if percentile > 0.0 && percentile <= 100.0 {
        Ok(())
    } else {
        Err(PoolError::InvalidArgument(percentile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_store_creation() {
        let store = PoolStore::new();
        assert_eq!(store.pool_count(), 0);
        assert!(!store.contains(1));
    }

    #[test]
    fn test_unknown_pool() {
        let store = PoolStore::new();
        assert_eq!(store.len(7), Err(PoolError::NotFound(7)));
        assert_eq!(store.quantile(7, 50.0), Err(PoolError::NotFound(7)));
        assert_eq!(store.values(7), None);
    }

    #[test]
    fn test_upsert_insert_then_append() {
        let store = PoolStore::new();

        assert_eq!(store.upsert(1, vec![1.0, 2.0, 3.0]), UpsertStatus::Inserted);
        assert!(store.contains(1));
        assert_eq!(store.len(1), Ok(3));

        assert_eq!(store.upsert(1, vec![4.0, 5.0]), UpsertStatus::Appended);
        assert_eq!(store.values(1), Some(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(store.len(1), Ok(5));
    }

    #[test]
    fn test_upsert_keeps_insertion_order() {
        let store = PoolStore::new();
        store.upsert(3, vec![9.0, -1.0]);
        store.upsert(3, vec![4.0, 0.5]);
        assert_eq!(store.values(3), Some(vec![9.0, -1.0, 4.0, 0.5]));

        // Querying sorts a copy, not the stored pool
        assert_eq!(store.quantile(3, 100.0), Ok(9.0));
        assert_eq!(store.values(3), Some(vec![9.0, -1.0, 4.0, 0.5]));
    }

    #[test]
    fn test_empty_upsert_creates_pool() {
        let store = PoolStore::new();
        assert_eq!(store.upsert(2, Vec::new()), UpsertStatus::Inserted);
        assert!(store.contains(2));
        assert_eq!(store.len(2), Ok(0));
        assert_eq!(store.quantile(2, 50.0), Err(PoolError::OutOfRange(2)));
    }

    #[test]
    fn test_invalid_percentile() {
        let store = PoolStore::new();
        store.upsert(1, vec![1.0, 2.0, 3.0]);

        for p in [-1.0, 0.0, 100.1, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(store.quantile(1, p), Err(PoolError::InvalidArgument(_))),
                "percentile {} should be rejected",
                p
            );
        }
        // Range is checked before existence
        assert!(matches!(
            store.quantile(99, 0.0),
            Err(PoolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_smallest_positive_percentile() {
        let store = PoolStore::new();
        store.upsert(1, (1..=100).rev().map(f64::from).collect());

        // Accepted by the range check and answered with the minimum
        assert_eq!(store.quantile(1, 5e-324), Ok(1.0));
        assert_eq!(store.quantile(1, f64::MIN_POSITIVE), Ok(1.0));
    }

    #[test]
    fn test_query_reports_count() {
        let store = PoolStore::new();
        store.upsert(1, vec![15.0, 20.0, 35.0, 40.0, 50.0]);
        let summary = store.query(1, 50.0).unwrap();
        assert_eq!(summary.quantile, 35.0);
        assert_eq!(summary.total_count, 5);
    }

    #[test]
    fn test_distinct_pools_are_independent() {
        let store = PoolStore::new();
        store.upsert(1, vec![1.0]);
        store.upsert(2, vec![2.0, 3.0]);
        assert_eq!(store.pool_count(), 2);
        assert_eq!(store.len(1), Ok(1));
        assert_eq!(store.len(2), Ok(2));
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let store = Arc::new(PoolStore::new());
        store.upsert(1, Vec::new());

        std::thread::scope(|s| {
            for t in 0..8 {
                let store = Arc::clone(&store);
                s.spawn(move || {
                    for chunk in 0..50 {
                        let base = (t * 1000 + chunk * 10) as f64;
                        store.upsert(1, (0..10).map(|i| base + i as f64).collect());
                    }
                });
            }
        });

        let mut values = store.values(1).unwrap();
        assert_eq!(values.len(), 8 * 50 * 10);
        values.sort_by(f64::total_cmp);
        let mut expected: Vec<f64> = (0..8)
            .flat_map(|t| (0..500).map(move |i| (t * 1000 + i) as f64))
            .collect();
        expected.sort_by(f64::total_cmp);
        assert_eq!(values, expected);
    }

    #[test]
    fn test_concurrent_first_upsert_inserts_once() {
        let store = PoolStore::new();

        let statuses: Vec<UpsertStatus> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = &store;
                    s.spawn(move || store.upsert(42, vec![i as f64]))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let inserted = statuses
            .iter()
            .filter(|s| **s == UpsertStatus::Inserted)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(store.len(42), Ok(16));
    }

    #[test]
    fn test_upsert_status_serializes_lowercase() {
        let json = serde_json::to_string(&UpsertStatus::Inserted).unwrap();
        assert_eq!(json, "\"inserted\"");
        let json = serde_json::to_string(&UpsertStatus::Appended).unwrap();
        assert_eq!(json, "\"appended\"");
    }
}
