//! Coverage checks between requested timestamps and a cached dataset
//!
//! Coverage is set membership, not a range test: a cache holding {1, 3, 5}
//! covers {1, 3} but not {1, 2, 3}.

use crate::data::{TabularDataset, TimestampSet};
use std::collections::HashSet;

/// Returns true when every requested timestamp is in the cached row index
///
/// An empty request is always covered.
pub fn is_fully_covered(requested: &TimestampSet, cached: &TabularDataset) -> bool {
    if requested.is_empty() {
        return true;
    }
    let index: HashSet<_> = cached.index().iter().collect();
    requested.iter().all(|ts| index.contains(ts))
}

/// Requested timestamps absent from the cached row index, in request order
pub fn missing_timestamps(requested: &TimestampSet, cached: &TabularDataset) -> TimestampSet {
    let index: HashSet<_> = cached.index().iter().collect();
    requested
        .iter()
        .filter(|ts| !index.contains(ts))
        .copied()
        .collect()
}
