//! Ordered, duplicate-free timestamp sets used as cache query keys

use super::Timestamp;
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;

/// An ordered sequence of unique timestamps
///
/// The caller supplies this as the query key of a cached call. After a
/// successful fetch the same timestamps become the row index of the produced
/// data, so insertion order is preserved and later duplicates are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimestampSet {
    items: Vec<Timestamp>,
}

impl TimestampSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds `periods` timestamps starting at `start`, spaced by `step`
    ///
    /// Stops early if the next timestamp would overflow the calendar.
    pub fn date_range(start: Timestamp, periods: usize, step: Duration) -> Self {
        let mut items = Vec::with_capacity(periods);
        let mut current = Some(start);
        for _ in 0..periods {
            let Some(ts) = current else { break };
            items.push(ts);
            current = ts.checked_add_signed(step);
        }
        items.into_iter().collect()
    }

    /// Builds `periods` consecutive days starting at midnight of `start`
    pub fn daily(start: NaiveDate, periods: usize) -> Self {
        Self::date_range(start.and_time(chrono::NaiveTime::MIN), periods, Duration::days(1))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Timestamp> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Timestamp] {
        &self.items
    }
}

impl FromIterator<Timestamp> for TimestampSet {
    fn from_iter<I: IntoIterator<Item = Timestamp>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let items = iter.into_iter().filter(|ts| seen.insert(*ts)).collect();
        Self { items }
    }
}

impl From<Vec<Timestamp>> for TimestampSet {
    fn from(items: Vec<Timestamp>) -> Self {
        items.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a TimestampSet {
    type Item = &'a Timestamp;
    type IntoIter = std::slice::Iter<'a, Timestamp>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
