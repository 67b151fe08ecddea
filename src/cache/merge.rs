//! Combining fresh rows with the existing cache and persisting the result

use super::format::CacheError;
use super::manager::CacheFile;
use crate::data::TabularDataset;

/// Merges `fresh` into `cached` and writes the combination to `file`
///
/// Only columns present in both datasets are kept and fresh rows win on
/// timestamp collisions. A cache with no rows adds no column constraint, so
/// the first write stores `fresh` as is.
///
/// # Returns
/// * `Ok(None)` if `fresh` is empty; the file is left untouched
/// * `Ok(Some(merged))` with the dataset that was written
/// * `Err` if the write fails
pub fn merge_and_save(
    fresh: &TabularDataset,
    cached: &TabularDataset,
    file: &CacheFile,
) -> Result<Option<TabularDataset>, CacheError> {
    if fresh.is_empty() {
        tracing::info!(path = %file.path().display(), "Cache not updated because requested data is empty");
        return Ok(None);
    }

    let merged = if cached.is_empty() {
        fresh.clone().dedup_index()
    } else {
        TabularDataset::concat_inner(fresh, cached)
    };

    file.write(&merged)?;
    tracing::info!(
        path = %file.path().display(),
        fresh = fresh.len(),
        rows = merged.len(),
        "Updating cache with requested data"
    );
    Ok(Some(merged))
}

/// Writes `fresh` as the whole cache, discarding previous content
pub fn replace_and_save(fresh: &TabularDataset, file: &CacheFile) -> Result<TabularDataset, CacheError> {
    let data = fresh.clone().dedup_index();
    file.write(&data)?;
    tracing::info!(path = %file.path().display(), rows = data.len(), "Saving data in cache");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PersistenceFormat;
    use crate::data::{Timestamp, Value};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn day(d: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2016, 12, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn rows(days: &[u32], value: f64) -> TabularDataset {
        let mut ds = TabularDataset::new(["price"]);
        for &d in days {
            ds.push_row(day(d), vec![Value::Float(value)]).unwrap();
        }
        ds
    }

    fn create_test_file(name: &str) -> (CacheFile, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let format = PersistenceFormat::from_file_name(name).unwrap();
        (CacheFile::new(temp_dir.path().to_path_buf(), name, format), temp_dir)
    }

    #[test]
    fn test_empty_fresh_leaves_file_untouched() {
        let (file, _temp_dir) = create_test_file("m.csv");
        file.write(&rows(&[1, 2], 1.0)).unwrap();
        let before = fs::read(file.path()).unwrap();

        let result = merge_and_save(&TabularDataset::new(["price"]), &file.read(), &file).unwrap();

        assert!(result.is_none());
        assert_eq!(fs::read(file.path()).unwrap(), before);
    }

    #[test]
    fn test_empty_fresh_does_not_create_file() {
        let (file, _temp_dir) = create_test_file("m.json");

        merge_and_save(&TabularDataset::empty(), &TabularDataset::empty(), &file).unwrap();

        assert!(!file.exists());
    }

    #[test]
    fn test_fresh_values_take_precedence() {
        let (file, _temp_dir) = create_test_file("m.json");
        let cached = rows(&[1, 2, 3], 1.0);
        file.write(&cached).unwrap();

        let merged = merge_and_save(&rows(&[3, 4], 9.0), &cached, &file)
            .unwrap()
            .expect("Fresh rows should be written");

        assert_eq!(merged.len(), 4);
        let persisted = file.read();
        assert_eq!(persisted.value(&day(3), "price"), Some(&Value::Float(9.0)));
        assert_eq!(persisted.value(&day(1), "price"), Some(&Value::Float(1.0)));
        assert_eq!(persisted, merged);
    }

    #[test]
    fn test_first_write_keeps_all_fresh_columns() {
        let (file, _temp_dir) = create_test_file("m.pickle");
        let fresh = TabularDataset::new(["a", "b"])
            .with_row(day(1), vec![Value::Int(1), Value::Int(2)])
            .unwrap();

        let merged = merge_and_save(&fresh, &TabularDataset::empty(), &file)
            .unwrap()
            .unwrap();

        assert_eq!(merged, fresh);
        assert_eq!(file.read(), fresh);
    }

    #[test]
    fn test_replace_discards_previous_rows() {
        let (file, _temp_dir) = create_test_file("r.csv");
        file.write(&rows(&[1, 2, 3, 4, 5], 1.0)).unwrap();

        replace_and_save(&rows(&[2, 3], 7.0), &file).unwrap();

        let persisted = file.read();
        assert_eq!(persisted.index(), &[day(2), day(3)]);
        assert_eq!(persisted.value(&day(2), "price"), Some(&Value::Float(7.0)));
    }
}
