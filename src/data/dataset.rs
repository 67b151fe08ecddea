//! Timestamp-indexed tabular dataset
//!
//! Rows are keyed by a [`Timestamp`] and hold one [`Value`] per column. The
//! index is not required to be sorted; order is whatever the producer or the
//! merge step left behind.

use super::{Timestamp, TimestampSet, Value};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised when building a dataset by hand
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    /// A row did not have one value per column
    #[error("Row at {timestamp} has {got} values, expected {expected}")]
    RowArity {
        timestamp: Timestamp,
        expected: usize,
        got: usize,
    },

    /// Decoded index and row lists have different lengths
    #[error("Index has {index} timestamps but there are {rows} rows")]
    IndexLength { index: usize, rows: usize },
}

/// Rows keyed by timestamp with producer-defined columns
///
/// Deserialization goes through the same arity check as
/// [`push_row`](Self::push_row), so a decoded dataset always has one value
/// per column in every row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetParts")]
pub struct TabularDataset {
    columns: Vec<String>,
    index: Vec<Timestamp>,
    rows: Vec<Vec<Value>>,
}

/// Unchecked serde layout of [`TabularDataset`]; field order must match
#[derive(Deserialize)]
struct DatasetParts {
    columns: Vec<String>,
    index: Vec<Timestamp>,
    rows: Vec<Vec<Value>>,
}

impl TryFrom<DatasetParts> for TabularDataset {
    type Error = DatasetError;

    fn try_from(parts: DatasetParts) -> Result<Self, DatasetError> {
        Self::from_parts(parts.columns, parts.index, parts.rows)
    }
}

impl TabularDataset {
    /// Creates a dataset with the given columns and no rows
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// A dataset with no columns and no rows, used for cache misses
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends a row; the number of values must match the number of columns
    pub fn push_row(&mut self, timestamp: Timestamp, values: Vec<Value>) -> Result<(), DatasetError> {
        if values.len() != self.columns.len() {
            return Err(DatasetError::RowArity {
                timestamp,
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        self.index.push(timestamp);
        self.rows.push(values);
        Ok(())
    }

    /// Builder-style variant of [`push_row`](Self::push_row)
    pub fn with_row(mut self, timestamp: Timestamp, values: Vec<Value>) -> Result<Self, DatasetError> {
        self.push_row(timestamp, values)?;
        Ok(self)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[Timestamp] {
        &self.index
    }

    /// Iterates over `(timestamp, row)` pairs in index order
    pub fn rows(&self) -> impl Iterator<Item = (&Timestamp, &[Value])> {
        self.index.iter().zip(self.rows.iter().map(Vec::as_slice))
    }

    /// Returns the first row stored at `timestamp`
    pub fn row(&self, timestamp: &Timestamp) -> Option<&[Value]> {
        self.index
            .iter()
            .position(|ts| ts == timestamp)
            .map(|pos| self.rows[pos].as_slice())
    }

    /// Returns a single cell by timestamp and column name
    pub fn value(&self, timestamp: &Timestamp, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(timestamp).map(|row| &row[col])
    }

    /// The row index as a [`TimestampSet`]
    pub fn timestamps(&self) -> TimestampSet {
        self.index.iter().copied().collect()
    }

    /// Rows at the requested timestamps, in request order
    ///
    /// Requested timestamps without a row are skipped. If the index holds a
    /// timestamp more than once, the first row wins.
    pub fn select(&self, requested: &TimestampSet) -> Self {
        let positions = self.first_positions();
        let mut out = Self::new(self.columns.iter().cloned());
        for ts in requested {
            if let Some(&pos) = positions.get(ts) {
                out.index.push(*ts);
                out.rows.push(self.rows[pos].clone());
            }
        }
        out
    }

    /// Combines two datasets keeping only the columns present in both
    ///
    /// Column order follows `first`. Rows of `first` come first; rows of
    /// `second` are appended only when their timestamp is not already present,
    /// so `first` wins on collisions and the result has a unique index.
    pub fn concat_inner(first: &Self, second: &Self) -> Self {
        let second_cols: HashMap<&str, usize> = second
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let shared: Vec<(usize, usize)> = first
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| second_cols.get(c.as_str()).map(|&j| (i, j)))
            .collect();

        let mut out = Self::new(shared.iter().map(|&(i, _)| first.columns[i].clone()));
        let mut seen = HashSet::new();
        for (ts, row) in first.rows() {
            if seen.insert(*ts) {
                out.index.push(*ts);
                out.rows.push(shared.iter().map(|&(i, _)| row[i].clone()).collect());
            }
        }
        for (ts, row) in second.rows() {
            if seen.insert(*ts) {
                out.index.push(*ts);
                out.rows.push(shared.iter().map(|&(_, j)| row[j].clone()).collect());
            }
        }
        out
    }

    /// Drops rows whose timestamp already appeared earlier in the index
    pub fn dedup_index(mut self) -> Self {
        let mut seen = HashSet::new();
        let keep: Vec<bool> = self.index.iter().map(|ts| seen.insert(*ts)).collect();
        if keep.iter().all(|k| *k) {
            return self;
        }
        let mut flags = keep.iter();
        self.index.retain(|_| *flags.next().unwrap_or(&true));
        let mut flags = keep.iter();
        self.rows.retain(|_| *flags.next().unwrap_or(&true));
        self
    }

    /// Rebuilds a dataset from decoded parts, checking row arity
    pub(crate) fn from_parts(
        columns: Vec<String>,
        index: Vec<Timestamp>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, DatasetError> {
        if index.len() != rows.len() {
            return Err(DatasetError::IndexLength {
                index: index.len(),
                rows: rows.len(),
            });
        }
        let mut out = Self::new(columns);
        for (ts, row) in index.into_iter().zip(rows) {
            out.push_row(ts, row)?;
        }
        Ok(out)
    }

    fn first_positions(&self) -> HashMap<Timestamp, usize> {
        let mut positions = HashMap::with_capacity(self.index.len());
        for (pos, ts) in self.index.iter().enumerate() {
            positions.entry(*ts).or_insert(pos);
        }
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2016, 12, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample(days: &[u32], tag: &str) -> TabularDataset {
        let mut ds = TabularDataset::new(["value", "label"]);
        for &d in days {
            ds.push_row(day(d), vec![Value::Int(d as i64), Value::from(tag)])
                .unwrap();
        }
        ds
    }

    #[test]
    fn test_push_row_rejects_wrong_arity() {
        let mut ds = TabularDataset::new(["a", "b"]);
        let err = ds.push_row(day(1), vec![Value::Int(1)]).unwrap_err();

        assert_eq!(
            err,
            DatasetError::RowArity {
                timestamp: day(1),
                expected: 2,
                got: 1
            }
        );
        assert!(ds.is_empty());
    }

    #[test]
    fn test_select_follows_request_order_and_skips_missing() {
        let ds = sample(&[1, 2, 3], "x");
        let requested: TimestampSet = vec![day(3), day(9), day(1)].into();

        let out = ds.select(&requested);

        assert_eq!(out.index(), &[day(3), day(1)]);
        assert_eq!(out.value(&day(3), "value"), Some(&Value::Int(3)));
        assert_eq!(out.columns(), ds.columns());
    }

    #[test]
    fn test_concat_inner_first_wins_on_collision() {
        let fresh = sample(&[2, 3], "fresh");
        let cached = sample(&[1, 2], "cached");

        let merged = TabularDataset::concat_inner(&fresh, &cached);

        assert_eq!(merged.index(), &[day(2), day(3), day(1)]);
        assert_eq!(merged.value(&day(2), "label"), Some(&Value::from("fresh")));
        assert_eq!(merged.value(&day(1), "label"), Some(&Value::from("cached")));
    }

    #[test]
    fn test_concat_inner_keeps_only_shared_columns() {
        let fresh = TabularDataset::new(["b", "a", "only_fresh"])
            .with_row(day(1), vec![Value::Int(2), Value::Int(1), Value::Int(0)])
            .unwrap();
        let cached = TabularDataset::new(["a", "b", "only_cached"])
            .with_row(day(2), vec![Value::Int(10), Value::Int(20), Value::Int(0)])
            .unwrap();

        let merged = TabularDataset::concat_inner(&fresh, &cached);

        assert_eq!(merged.columns(), &["b".to_string(), "a".to_string()]);
        assert_eq!(merged.row(&day(2)), Some(&[Value::Int(20), Value::Int(10)][..]));
    }

    #[test]
    fn test_dedup_index_keeps_first_occurrence() {
        let mut ds = sample(&[1, 2], "first");
        ds.push_row(day(1), vec![Value::Int(99), Value::from("second")])
            .unwrap();

        let ds = ds.dedup_index();

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.value(&day(1), "value"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_timestamps_reflect_index() {
        let ds = sample(&[5, 4], "x");
        assert_eq!(ds.timestamps().as_slice(), &[day(5), day(4)]);
    }

    #[test]
    fn test_deserialize_rejects_rows_with_wrong_arity() {
        let json = r#"{
            "columns": ["a"],
            "index": ["2016-12-01T00:00:00"],
            "rows": [[{"Int": 1}, {"Int": 2}]]
        }"#;

        let err = serde_json::from_str::<TabularDataset>(json).unwrap_err();

        assert!(err.to_string().contains("expected 1"), "{}", err);
    }

    #[test]
    fn test_deserialize_rejects_index_row_mismatch() {
        let json = r#"{"columns": ["a"], "index": [], "rows": [[{"Int": 1}]]}"#;

        assert!(serde_json::from_str::<TabularDataset>(json).is_err());
    }

    #[test]
    fn test_serde_keeps_valid_dataset() {
        let ds = sample(&[1, 2], "x");

        let json = serde_json::to_string(&ds).unwrap();
        let back: TabularDataset = serde_json::from_str(&json).unwrap();

        assert_eq!(back, ds);
    }
}
