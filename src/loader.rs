//! Parser for headerless trip uploads.

use std::path::Path;

use chrono::Utc;
use csv::{ReaderBuilder, Trim};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{COLUMN_COUNT, Dataset, TripRecord};

/// Hex SHA-256 of an upload, used as its identity.
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Parses a headerless, 8-column CSV upload into a [`Dataset`].
///
/// # Errors
///
/// Returns [`Error::Input`] if the bytes contain no rows, a row has the wrong
/// number of columns, or a field cannot be parsed into its column type.
#[tracing::instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn load_dataset(bytes: &[u8]) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.map_err(|e| Error::input(format!("unreadable upload: {e}")))?;
        let line = row.position().map_or(records.len() as u64 + 1, |p| p.line());

        if row.len() != COLUMN_COUNT {
            return Err(Error::input(format!(
                "line {line}: expected {COLUMN_COUNT} columns, found {}",
                row.len()
            )));
        }

        let record: TripRecord = row
            .deserialize(None)
            .map_err(|e| Error::input(format!("line {line}: {e}")))?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(Error::input("the uploaded file is empty"));
    }

    info!(rows = records.len(), "Upload parsed");

    Ok(Dataset {
        records,
        source_digest: digest(bytes),
        loaded_at: Utc::now(),
    })
}

/// Reads an upload's raw bytes from disk.
///
/// # Errors
///
/// Returns [`Error::Input`] if the file does not exist or cannot be read.
pub fn read_upload(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(Error::input(format!(
            "file not selected: {} does not exist",
            path.display()
        )));
    }
    debug!(path = %path.display(), "Reading upload");
    std::fs::read(path).map_err(|e| Error::input(format!("cannot read {}: {e}", path.display())))
}

/// Reads and parses an upload from disk.
///
/// # Errors
///
/// Any error from [`read_upload`] or [`load_dataset`].
pub fn load_file(path: &Path) -> Result<Dataset> {
    load_dataset(&read_upload(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
1,2016-01-01 08:15:42,114.30,30.60,2016-01-01 08:20:00,114.35,30.55,258
1,2016-01-01 09:01:02,114.31,30.61,2016-01-01 09:30:00,114.40,30.50,1738
2,2016-01-01 14:00:00,114.20,30.70,2016-01-01 14:02:05,114.21,30.71,125
";

    #[test]
    fn test_row_count_matches_input() {
        let ds = load_dataset(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.records[0].id, 1);
        assert_eq!(ds.records[0].pickup_time, "2016-01-01 08:15:42");
        assert_eq!(ds.records[2].pickup_lon, 114.20);
        assert_eq!(ds.records[2].pickup_lat, 30.70);
        assert_eq!(ds.records[2].duration_seconds, 125);
    }

    #[test]
    fn test_empty_upload_is_input_error() {
        let result = load_dataset(b"");
        assert!(matches!(result, Err(Error::Input(_))));
    }

    #[test]
    fn test_column_mismatch_names_line() {
        let bad = "1,08:00:00,114.3,30.6,08:10:00,114.4,30.5,600\n2,08:00:00,114.3\n";
        match load_dataset(bad.as_bytes()) {
            Err(Error::Input(msg)) => {
                assert!(msg.contains("line 2"), "{msg}");
                assert!(msg.contains("expected 8"), "{msg}");
            }
            other => panic!("expected input error, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_field_is_input_error() {
        let bad = "abc,08:00:00,114.3,30.6,08:10:00,114.4,30.5,600\n";
        assert!(matches!(load_dataset(bad.as_bytes()), Err(Error::Input(_))));
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let result = load_file(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(Error::Input(_))));
    }

    #[test]
    fn test_digest_is_stable() {
        assert_eq!(digest(SAMPLE.as_bytes()), digest(SAMPLE.as_bytes()));
        assert_ne!(digest(b"a"), digest(b"b"));
        assert_eq!(digest(b"").len(), 64);
    }
}
