//! Output formatting and persistence for derived tables.
//!
//! Supports debug pretty-printing, JSON rendering, and CSV export of flat rows.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use csv::WriterBuilder;
use std::fmt::Debug;
use std::fs::File;
use std::path::Path;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl Debug) {
    debug!("{:#?}", value);
}

/// Renders a value as pretty-printed JSON.
pub fn to_json(value: &impl Serialize) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Writes `rows` to a CSV file with a header line, replacing any existing file.
///
/// Rows must be flat structs (no nested structs or maps).
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");

    let file = File::create(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{HourlyStat, TaxiOrderSummary};
    use std::fs;

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&TaxiOrderSummary { id: 1, order_count: 3 });
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&TaxiOrderSummary { id: 1, order_count: 3 }).unwrap();
        assert!(json.contains("\"order_count\": 3"));
    }

    #[test]
    fn test_write_table_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hourly.csv");
        let rows = vec![
            HourlyStat { hour: 8, average_duration_minutes: 15.0, order_count: 2 },
            HourlyStat { hour: 14, average_duration_minutes: 5.0, order_count: 1 },
        ];

        write_table(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "hour,average_duration_minutes,order_count");
        assert_eq!(lines[1], "8,15.0,2");
    }

    #[test]
    fn test_write_table_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        let rows = vec![TaxiOrderSummary { id: 1, order_count: 3 }];

        write_table(&path, &rows).unwrap();
        write_table(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
