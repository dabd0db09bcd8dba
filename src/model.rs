//! Core trip types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of positional columns in an upload.
pub const COLUMN_COUNT: usize = 8;

/// One taxi trip, in upload column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: i64,
    pub pickup_time: String,
    pub pickup_lon: f64,
    pub pickup_lat: f64,
    pub dropoff_time: String,
    pub dropoff_lon: f64,
    pub dropoff_lat: f64,
    pub duration_seconds: u64,
}

impl TripRecord {
    /// Trip length floored to whole minutes.
    pub fn duration_minutes(&self) -> u64 {
        self.duration_seconds / 60
    }
}

/// All records of a single upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<TripRecord>,
    /// Hex SHA-256 of the uploaded bytes.
    pub source_digest: String,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct taxi ids in ascending order.
    pub fn taxi_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.records.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn trip(id: i64, pickup_time: &str, duration_seconds: u64) -> TripRecord {
        TripRecord {
            id,
            pickup_time: pickup_time.to_string(),
            pickup_lon: 114.30,
            pickup_lat: 30.60,
            dropoff_time: pickup_time.to_string(),
            dropoff_lon: 114.35,
            dropoff_lat: 30.55,
            duration_seconds,
        }
    }

    pub fn dataset(records: Vec<TripRecord>) -> Dataset {
        Dataset {
            records,
            source_digest: "test".to_string(),
            loaded_at: Utc::now(),
        }
    }
}
