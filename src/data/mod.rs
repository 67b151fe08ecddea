//! Core data models for timestamp-indexed tables
//!
//! This module contains the types that flow through the cache: the timestamp
//! sets callers query with, the cell values a producer emits, and the tabular
//! dataset that gets persisted to disk.

pub mod calendar;
pub mod dataset;
pub mod timestamps;

pub use calendar::CalendarProducer;
pub use dataset::{DatasetError, TabularDataset};
pub use timestamps::TimestampSet;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Row index type of every dataset
///
/// Timestamps are timezone-naive; a timestamp read back from any cache format
/// compares equal to the one that was written.
pub type Timestamp = chrono::NaiveDateTime;

/// A single cell of a tabular dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Missing value
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Text("abc".into()).to_string(), "abc");
    }

    #[test]
    fn test_float_display_keeps_decimal_point() {
        // Whole floats must not be re-read as integers
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
    }
}
