//! Time-of-day and whole-minute fields computed from raw trips.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Dataset, TripRecord};

/// A trip together with the fields derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedTrip {
    #[serde(flatten)]
    pub record: TripRecord,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub duration_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedDataset {
    pub trips: Vec<DerivedTrip>,
}

impl DerivedDataset {
    /// Recomputes every derived column from the embedded records.
    pub fn rederive(&self) -> Result<Self> {
        derive_records(self.trips.iter().map(|t| &t.record))
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

/// Splits the trailing `HH:MM:SS` off a timestamp by fixed offsets from the end.
///
/// Any date prefix is ignored, so `"2016-01-01 08:15:42"` and `"08:15:42"`
/// both yield `(8, 15, 42)`. Surrounding spaces inside a component are
/// tolerated, so an unpadded hour such as `"2016-01-01 8:15:42"` also works.
///
/// # Errors
///
/// Returns [`Error::Format`] when the string is shorter than 8 characters or
/// a component is not a valid clock value.
pub fn split_clock(timestamp: &str) -> Result<(u32, u32, u32)> {
    let chars: Vec<char> = timestamp.chars().collect();
    let n = chars.len();
    if n < 8 {
        return Err(Error::format(format!(
            "timestamp {timestamp:?} is shorter than 8 characters"
        )));
    }

    let field = |range: std::ops::Range<usize>, name: &str, max: u32| -> Result<u32> {
        let text: String = chars[range].iter().collect();
        text.trim()
            .parse::<u32>()
            .ok()
            .filter(|v| *v <= max)
            .ok_or_else(|| Error::format(format!("invalid {name} {text:?} in {timestamp:?}")))
    };

    let hour = field(n - 8..n - 6, "hour", 23)?;
    let minute = field(n - 5..n - 3, "minute", 59)?;
    let second = field(n - 2..n, "second", 59)?;
    Ok((hour, minute, second))
}

/// Derives clock and duration fields for every record.
///
/// # Errors
///
/// Returns [`Error::Format`] naming the first record whose pickup timestamp
/// cannot be split.
pub fn derive(dataset: &Dataset) -> Result<DerivedDataset> {
    derive_records(dataset.records.iter())
}

fn derive_records<'a>(records: impl Iterator<Item = &'a TripRecord>) -> Result<DerivedDataset> {
    let trips = records
        .enumerate()
        .map(|(row, record)| {
            let (hour, minute, second) = split_clock(&record.pickup_time).map_err(|e| match e {
                Error::Format(msg) => Error::format(format!("row {}: {msg}", row + 1)),
                other => other,
            })?;
            Ok(DerivedTrip {
                record: record.clone(),
                hour,
                minute,
                second,
                duration_minutes: record.duration_minutes(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DerivedDataset { trips })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{dataset, trip};

    #[test]
    fn test_split_full_timestamp() {
        assert_eq!(split_clock("2016-01-01 08:15:42").unwrap(), (8, 15, 42));
    }

    #[test]
    fn test_split_bare_clock() {
        assert_eq!(split_clock("23:59:01").unwrap(), (23, 59, 1));
    }

    #[test]
    fn test_split_unpadded_hour() {
        assert_eq!(split_clock("2016-01-01 8:15:42").unwrap(), (8, 15, 42));
        assert_eq!(split_clock("2016/1/1 9:05:00").unwrap(), (9, 5, 0));
    }

    #[test]
    fn test_short_timestamp_is_format_error() {
        assert!(matches!(split_clock("8:15:42"), Err(Error::Format(_))));
        assert!(matches!(split_clock(""), Err(Error::Format(_))));
    }

    #[test]
    fn test_non_numeric_component_is_format_error() {
        assert!(matches!(split_clock("2016-01-01 xx:15:42"), Err(Error::Format(_))));
        assert!(matches!(split_clock("2016-01-01 25:15:42"), Err(Error::Format(_))));
    }

    #[test]
    fn test_derive_fields() {
        let ds = dataset(vec![trip(1, "2016-01-01 08:15:42", 125)]);
        let derived = derive(&ds).unwrap();
        let t = &derived.trips[0];

        assert_eq!((t.hour, t.minute, t.second), (8, 15, 42));
        assert_eq!(t.duration_minutes, 2);
        assert_eq!(t.record, ds.records[0]);
    }

    #[test]
    fn test_derive_error_names_row() {
        let ds = dataset(vec![trip(1, "2016-01-01 08:15:42", 60), trip(2, "bad", 60)]);
        match derive(&ds) {
            Err(Error::Format(msg)) => assert!(msg.starts_with("row 2"), "{msg}"),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn test_derive_is_idempotent() {
        let ds = dataset(vec![
            trip(1, "2016-01-01 08:15:42", 125),
            trip(2, "2016-01-01 14:00:59", 3599),
        ]);
        let first = derive(&ds).unwrap();
        let second = derive(&ds).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.rederive().unwrap(), first);
    }
}
