//! On-disk encodings for cached datasets
//!
//! The encoding is picked once from the cache file's suffix and then reused
//! for every load and save.

use crate::data::{DatasetError, TabularDataset, Timestamp, Value};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Header of the timestamp column in delimited-text caches
const CSV_INDEX_HEADER: &str = "timestamp";

/// Timestamp layout used when writing text formats
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Errors that can occur while reading or writing cache files
#[derive(Debug, Error)]
pub enum CacheError {
    /// No cache file name was given
    #[error("A cache file name is required")]
    MissingFileName,

    /// The file suffix does not map to a known encoding
    #[error("Unknown type of persistence: '{0}'. Supported suffixes: csv, json, pickle, bin")]
    UnsupportedFormat(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-text encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Structured-record encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary-object encoding error
    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    /// File decoded but did not describe a valid dataset
    #[error("Malformed cache content: {0}")]
    Malformed(String),
}

impl From<DatasetError> for CacheError {
    fn from(e: DatasetError) -> Self {
        CacheError::Malformed(e.to_string())
    }
}

/// Serialization format of a cache file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceFormat {
    /// Delimited text (`.csv`)
    Csv,
    /// Structured records (`.json`)
    Json,
    /// Binary object (`.pickle`, `.bin`)
    Binary,
}

impl PersistenceFormat {
    /// Resolves the format from a cache file name such as `prices.csv`
    pub fn from_file_name(file_name: &str) -> Result<Self, CacheError> {
        if file_name.trim().is_empty() {
            return Err(CacheError::MissingFileName);
        }
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| CacheError::UnsupportedFormat(file_name.to_string()))?;

        match suffix.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pickle" | "bin" => Ok(Self::Binary),
            other => Err(CacheError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Reads a dataset from `path`
    ///
    /// This is the strict variant; see [`CacheFile::read`](super::CacheFile::read)
    /// for the lenient one that maps failures to an empty dataset.
    pub fn load(self, path: &Path) -> Result<TabularDataset, CacheError> {
        match self {
            Self::Csv => load_csv(path),
            Self::Json => load_json(path),
            Self::Binary => load_binary(path),
        }
    }

    /// Writes `dataset` to `path`, replacing any existing file
    pub fn save(self, dataset: &TabularDataset, path: &Path) -> Result<(), CacheError> {
        match self {
            Self::Csv => save_csv(dataset, path),
            Self::Json => save_json(dataset, path),
            Self::Binary => save_binary(dataset, path),
        }
    }
}

fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses the timestamp forms the text formats may contain
fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn require_timestamp(s: &str) -> Result<Timestamp, CacheError> {
    parse_timestamp(s).ok_or_else(|| CacheError::Malformed(format!("invalid timestamp '{}'", s)))
}

// --- delimited text ---

/// Cell type of a delimited-text column, stored in the header as `name:kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int,
    Float,
    Text,
    /// Cells of several types, or empty strings; each cell carries a tag
    Mixed,
}

impl ColumnKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Mixed => "mixed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "text" => Some(Self::Text),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    /// Narrowest kind that encodes every cell of column `col` losslessly
    fn of_column(dataset: &TabularDataset, col: usize) -> Self {
        let mut kind = None;
        for (_, row) in dataset.rows() {
            let cell = match &row[col] {
                Value::Null => continue,
                Value::Text(s) if s.is_empty() => return Self::Mixed,
                Value::Bool(_) => Self::Bool,
                Value::Int(_) => Self::Int,
                Value::Float(_) => Self::Float,
                Value::Text(_) => Self::Text,
            };
            match kind {
                None => kind = Some(cell),
                Some(k) if k != cell => return Self::Mixed,
                Some(_) => {}
            }
        }
        // An all-null column reads back as nulls under any kind
        kind.unwrap_or(Self::Text)
    }
}

fn save_csv(dataset: &TabularDataset, path: &Path) -> Result<(), CacheError> {
    let kinds: Vec<ColumnKind> = (0..dataset.columns().len())
        .map(|col| ColumnKind::of_column(dataset, col))
        .collect();
    write_delimited(dataset, File::create(path)?, Some(&kinds))
}

/// Writes `dataset` as delimited text to any writer
///
/// The first column is `timestamp`, followed by the dataset's columns. Cells
/// are written as plain text with no type information, which suits display
/// but not caching.
pub fn write_csv<W: Write>(dataset: &TabularDataset, out: W) -> Result<(), CacheError> {
    write_delimited(dataset, out, None)
}

fn write_delimited<W: Write>(
    dataset: &TabularDataset,
    out: W,
    kinds: Option<&[ColumnKind]>,
) -> Result<(), CacheError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = Vec::with_capacity(dataset.columns().len() + 1);
    header.push(CSV_INDEX_HEADER.to_string());
    for (col, name) in dataset.columns().iter().enumerate() {
        match kinds {
            Some(kinds) => header.push(format!("{}:{}", name, kinds[col].as_str())),
            None => header.push(name.clone()),
        }
    }
    writer.write_record(&header)?;

    for (ts, row) in dataset.rows() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(format_timestamp(ts));
        for (col, value) in row.iter().enumerate() {
            match kinds {
                Some(kinds) if kinds[col] == ColumnKind::Mixed => record.push(tag_cell(value)),
                _ => record.push(value.to_string()),
            }
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn load_csv(path: &Path) -> Result<TabularDataset, CacheError> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(CacheError::Malformed("missing header row".to_string()));
    }
    let (names, kinds): (Vec<String>, Vec<Option<ColumnKind>>) =
        headers.iter().skip(1).map(split_header).unzip();
    let mut dataset = TabularDataset::new(names);

    for record in reader.records() {
        let record = record?;
        let mut fields = record.iter();
        let ts = require_timestamp(fields.next().unwrap_or_default())?;
        let row = fields
            .zip(&kinds)
            .map(|(field, kind)| match kind {
                Some(kind) => decode_cell(*kind, field),
                None => Ok(infer_value(field)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        dataset.push_row(ts, row)?;
    }
    Ok(dataset)
}

/// Splits `name:kind`; headers without a known kind are returned untyped
fn split_header(header: &str) -> (String, Option<ColumnKind>) {
    header
        .rsplit_once(':')
        .and_then(|(name, kind)| ColumnKind::parse(kind).map(|k| (name.to_string(), Some(k))))
        .unwrap_or_else(|| (header.to_string(), None))
}

/// Encodes a cell of a mixed column as `tag:value`; nulls stay empty
fn tag_cell(value: &Value) -> String {
    let tag = match value {
        Value::Null => return String::new(),
        Value::Bool(_) => "b",
        Value::Int(_) => "i",
        Value::Float(_) => "f",
        Value::Text(_) => "t",
    };
    format!("{}:{}", tag, value)
}

fn decode_cell(kind: ColumnKind, field: &str) -> Result<Value, CacheError> {
    if field.is_empty() {
        return Ok(Value::Null);
    }
    let malformed = || {
        CacheError::Malformed(format!("'{}' is not a valid {} cell", field, kind.as_str()))
    };
    match kind {
        ColumnKind::Bool => field.parse().map(Value::Bool).map_err(|_| malformed()),
        ColumnKind::Int => field.parse().map(Value::Int).map_err(|_| malformed()),
        ColumnKind::Float => field.parse().map(Value::Float).map_err(|_| malformed()),
        ColumnKind::Text => Ok(Value::Text(field.to_string())),
        ColumnKind::Mixed => match field.split_once(':') {
            Some(("t", rest)) => Ok(Value::Text(rest.to_string())),
            Some(("b", rest)) if !rest.is_empty() => decode_cell(ColumnKind::Bool, rest),
            Some(("i", rest)) if !rest.is_empty() => decode_cell(ColumnKind::Int, rest),
            Some(("f", rest)) if !rest.is_empty() => decode_cell(ColumnKind::Float, rest),
            _ => Err(malformed()),
        },
    }
}

/// Recovers a cell from an untyped column, such as a hand-written file
fn infer_value(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match field {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = field.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(x) = field.parse::<f64>() {
        return Value::Float(x);
    }
    Value::Text(field.to_string())
}

// --- structured records ---

/// Split-oriented JSON document
#[derive(Debug, Serialize, Deserialize)]
struct JsonRecord {
    columns: Vec<String>,
    index: Vec<String>,
    data: Vec<Vec<serde_json::Value>>,
}

fn save_json(dataset: &TabularDataset, path: &Path) -> Result<(), CacheError> {
    let record = JsonRecord {
        columns: dataset.columns().to_vec(),
        index: dataset.index().iter().map(format_timestamp).collect(),
        data: dataset
            .rows()
            .map(|(_, row)| row.iter().map(to_json).collect())
            .collect(),
    };

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &record)?;
    writer.flush()?;
    Ok(())
}

fn load_json(path: &Path) -> Result<TabularDataset, CacheError> {
    let reader = BufReader::new(File::open(path)?);
    let record: JsonRecord = serde_json::from_reader(reader)?;

    let index = record
        .index
        .iter()
        .map(|s| require_timestamp(s))
        .collect::<Result<Vec<_>, _>>()?;
    let rows = record
        .data
        .into_iter()
        .map(|row| row.into_iter().map(from_json).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TabularDataset::from_parts(record.columns, index, rows)?)
}

fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        // Non-finite floats have no JSON form and are stored as null
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Text(s) => serde_json::Value::String(s.clone()),
    }
}

fn from_json(value: serde_json::Value) -> Result<Value, CacheError> {
    match value {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .ok_or_else(|| CacheError::Malformed(format!("unsupported number {}", n))),
        serde_json::Value::String(s) => Ok(Value::Text(s)),
        other => Err(CacheError::Malformed(format!("nested value {}", other))),
    }
}

// --- binary object ---

fn save_binary(dataset: &TabularDataset, path: &Path) -> Result<(), CacheError> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, dataset)?;
    writer.flush()?;
    Ok(())
}

fn load_binary(path: &Path) -> Result<TabularDataset, CacheError> {
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}
