//! Built-in calendar producer used by the `tscache` binary
//!
//! Derives a handful of calendar features for each requested timestamp. It
//! stands in for a slow upstream source when exercising the cache from the
//! command line.

use super::{DatasetError, TabularDataset, TimestampSet, Value};
use crate::persist::Producer;
use chrono::{Datelike, Timelike, Weekday};
use std::cell::Cell;

/// Column names emitted by [`CalendarProducer`]
pub const CALENDAR_COLUMNS: [&str; 4] = ["day_of_week", "day_of_year", "hour", "is_weekend"];

/// Producer that emits one calendar-feature row per requested timestamp
#[derive(Debug, Default)]
pub struct CalendarProducer {
    calls: Cell<usize>,
}

impl CalendarProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the producer has been invoked
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Producer for CalendarProducer {
    type Params = ();
    type Error = DatasetError;

    fn produce(&self, timestamps: &TimestampSet, _params: &()) -> Result<TabularDataset, DatasetError> {
        self.calls.set(self.calls.get() + 1);

        let mut data = TabularDataset::new(CALENDAR_COLUMNS);
        for ts in timestamps {
            let weekday = ts.weekday();
            data.push_row(
                *ts,
                vec![
                    Value::Int(weekday.num_days_from_monday() as i64),
                    Value::Int(ts.ordinal() as i64),
                    Value::Int(ts.hour() as i64),
                    Value::Bool(matches!(weekday, Weekday::Sat | Weekday::Sun)),
                ],
            )?;
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_one_row_per_requested_timestamp() {
        let producer = CalendarProducer::new();
        let requested = TimestampSet::daily(NaiveDate::from_ymd_opt(2016, 12, 1).unwrap(), 5);

        let data = producer.produce(&requested, &()).unwrap();

        assert_eq!(data.len(), 5);
        assert_eq!(data.index(), requested.as_slice());
        assert_eq!(producer.calls(), 1);
    }

    #[test]
    fn test_weekend_flag() {
        let producer = CalendarProducer::new();
        // 2016-12-03 was a Saturday
        let requested = TimestampSet::daily(NaiveDate::from_ymd_opt(2016, 12, 2).unwrap(), 2);

        let data = producer.produce(&requested, &()).unwrap();

        let fri = requested.as_slice()[0];
        let sat = requested.as_slice()[1];
        assert_eq!(data.value(&fri, "is_weekend"), Some(&Value::Bool(false)));
        assert_eq!(data.value(&sat, "is_weekend"), Some(&Value::Bool(true)));
        assert_eq!(data.value(&sat, "day_of_week"), Some(&Value::Int(5)));
        assert_eq!(data.value(&sat, "day_of_year"), Some(&Value::Int(338)));
    }
}
