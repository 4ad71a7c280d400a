//! Nearest-rank quantile strategies
//!
//! Both strategies pick an existing observation (no interpolation) at rank
//! `ceil(percentile / 100 * n)`:
//!
//! - Small pools are fully sorted and indexed directly. The rank is floored
//!   at 1 so percentiles that underflow to zero still pick the minimum, but it
//!   is not clamped above, so ranks past `n` have no valid target.
//! - Large pools use the inverted-CDF definition evaluated by partial
//!   selection, which only orders the slice around the target rank.
//!
//! Values are ordered with [`f64::total_cmp`], so NaN and signed zeros have a
//! fixed position instead of poisoning the sort.

use crate::SMALL_POOL_LIMIT;

/// Zero-based index of the nearest-rank element, or `None` for an empty
/// slice, a NaN percentile or a rank above `len`.
///
/// Subnormal percentiles such as `5e-324` make `percentile / 100` round to
/// zero; the rank is raised to 1 so they still select the minimum.
pub fn nearest_rank_index(len: usize, percentile: f64) -> Option<usize> {
    if len == 0 || percentile.is_nan() {
        return None;
    }
    let rank = (percentile / 100.0 * len as f64).ceil().max(1.0);
    let index = rank as usize - 1;
    (index < len).then_some(index)
}

/// Inverted-CDF index: the same rank as [`nearest_rank_index`] but clipped
/// into `[0, len - 1]`. `None` only for an empty slice.
pub fn inverted_cdf_index(len: usize, percentile: f64) -> Option<usize> {
    let last = len.checked_sub(1)?;
    let rank = (percentile / 100.0 * len as f64).ceil() as usize;
    Some(rank.saturating_sub(1).min(last))
}

/// Sort `values` ascending and return the nearest-rank element.
pub fn quantile_sorted(values: &mut [f64], percentile: f64) -> Option<f64> {
    values.sort_unstable_by(f64::total_cmp);
    let index = nearest_rank_index(values.len(), percentile)?;
    values.get(index).copied()
}

/// Inverted-CDF quantile via `select_nth_unstable_by`, O(n) on average.
///
/// Leaves `values` partitioned around the returned element.
pub fn quantile_select(values: &mut [f64], percentile: f64) -> Option<f64> {
    let index = inverted_cdf_index(values.len(), percentile)?;
    let (_, nth, _) = values.select_nth_unstable_by(index, f64::total_cmp);
    Some(*nth)
}

/// Nearest-rank quantile, choosing the strategy by pool size.
///
/// `percentile` is expected in `(0, 100]`; range checking is the caller's job.
/// Returns `None` when `values` is empty.
pub fn nearest_rank(values: &mut [f64], percentile: f64) -> Option<f64> {
    if values.len() <= SMALL_POOL_LIMIT {
        quantile_sorted(values, percentile)
    } else {
        quantile_select(values, percentile)
    }
}
