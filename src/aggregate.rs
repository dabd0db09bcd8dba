//! Group-by statistics and outlier-bounded views.
//!
//! Every function here borrows its input and returns a fresh value; the
//! loaded [`Dataset`] is never modified.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::derive::{DerivedDataset, DerivedTrip};
use crate::error::{Error, Result};
use crate::model::{Dataset, TripRecord};
use crate::stats::{Summary, describe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxiOrderSummary {
    pub id: i64,
    pub order_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyStat {
    pub hour: u32,
    pub average_duration_minutes: f64,
    pub order_count: u64,
}

/// One bar of the trip-duration histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationBin {
    pub duration_minutes: u64,
    pub frequency: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetOverview {
    pub record_count: usize,
    pub taxi_count: usize,
    pub min_duration_minutes: u64,
    pub max_duration_minutes: u64,
}

/// Inclusive `[low, high]` range outside of which values count as outliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutlierBound {
    pub low: u64,
    pub high: u64,
}

impl OutlierBound {
    /// # Errors
    ///
    /// Returns [`Error::Input`] if `low` is greater than `high`.
    pub fn new(low: u64, high: u64) -> Result<Self> {
        if low > high {
            return Err(Error::input(format!(
                "lower bound {low} is greater than upper bound {high}"
            )));
        }
        Ok(Self { low, high })
    }

    /// The default bound: the observed minimum and maximum. `None` if empty.
    pub fn observed(values: impl IntoIterator<Item = u64>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self { low: v, high: v }),
            Some(b) => Some(Self {
                low: b.low.min(v),
                high: b.high.max(v),
            }),
        })
    }

    pub fn contains(&self, value: u64) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Sorted distinct values, i.e. the positions a range slider may snap to.
pub fn bound_options(values: impl IntoIterator<Item = u64>) -> Vec<u64> {
    let mut options: Vec<u64> = values.into_iter().collect();
    options.sort_unstable();
    options.dedup();
    options
}

/// Number of trips per taxi, most active first (ties by ascending id).
pub fn order_counts(dataset: &Dataset) -> Vec<TaxiOrderSummary> {
    let mut counts: HashMap<i64, u64> = HashMap::new();
    for record in &dataset.records {
        *counts.entry(record.id).or_default() += 1;
    }

    let mut rows: Vec<TaxiOrderSummary> = counts
        .into_iter()
        .map(|(id, order_count)| TaxiOrderSummary { id, order_count })
        .collect();
    rows.sort_by(|a, b| b.order_count.cmp(&a.order_count).then(a.id.cmp(&b.id)));

    debug!(taxis = rows.len(), "Order counts computed");
    rows
}

/// Distribution summary of per-taxi order counts.
pub fn order_count_summary(rows: &[TaxiOrderSummary]) -> Option<Summary> {
    let values: Vec<f64> = rows.iter().map(|r| r.order_count as f64).collect();
    describe(&values)
}

/// Taxis whose order count lies within `bound`.
pub fn filter_orders(rows: &[TaxiOrderSummary], bound: OutlierBound) -> Vec<TaxiOrderSummary> {
    rows.iter()
        .filter(|r| bound.contains(r.order_count))
        .copied()
        .collect()
}

/// Taxis with strictly more than `low` and strictly fewer than `high` orders.
pub fn taxis_with_orders_between(
    rows: &[TaxiOrderSummary],
    low: u64,
    high: u64,
) -> Vec<TaxiOrderSummary> {
    rows.iter()
        .filter(|r| low < r.order_count && r.order_count < high)
        .copied()
        .collect()
}

/// Every trip made by taxi `id`, in upload order.
pub fn records_for_taxi(dataset: &Dataset, id: i64) -> Vec<&TripRecord> {
    dataset.records.iter().filter(|r| r.id == id).collect()
}

/// Trips whose whole-minute duration lies within `bound`.
pub fn filter_by_duration(derived: &DerivedDataset, bound: OutlierBound) -> Vec<&DerivedTrip> {
    derived
        .trips
        .iter()
        .filter(|t| bound.contains(t.duration_minutes))
        .collect()
}

/// Per-hour trip count and mean duration. Hours without trips are omitted.
pub fn hourly_stats<'a>(trips: impl IntoIterator<Item = &'a DerivedTrip>) -> Vec<HourlyStat> {
    let mut groups: BTreeMap<u32, (u64, u64)> = BTreeMap::new();
    for trip in trips {
        let (count, total) = groups.entry(trip.hour).or_default();
        *count += 1;
        *total += trip.duration_minutes;
    }

    groups
        .into_iter()
        .map(|(hour, (count, total))| HourlyStat {
            hour,
            average_duration_minutes: total as f64 / count as f64,
            order_count: count,
        })
        .collect()
}

/// Trip count per whole-minute duration, ascending by duration.
pub fn duration_frequency<'a>(trips: impl IntoIterator<Item = &'a DerivedTrip>) -> Vec<DurationBin> {
    let mut bins: BTreeMap<u64, u64> = BTreeMap::new();
    for trip in trips {
        *bins.entry(trip.duration_minutes).or_default() += 1;
    }
    bins.into_iter()
        .map(|(duration_minutes, frequency)| DurationBin {
            duration_minutes,
            frequency,
        })
        .collect()
}

pub fn duration_summary<'a>(trips: impl IntoIterator<Item = &'a DerivedTrip>) -> Option<Summary> {
    let values: Vec<f64> = trips
        .into_iter()
        .map(|t| t.duration_minutes as f64)
        .collect();
    describe(&values)
}

/// Headline numbers for an upload.
pub fn overview(dataset: &Dataset) -> DatasetOverview {
    let bound = OutlierBound::observed(dataset.records.iter().map(TripRecord::duration_minutes))
        .unwrap_or(OutlierBound { low: 0, high: 0 });
    DatasetOverview {
        record_count: dataset.len(),
        taxi_count: dataset.taxi_ids().len(),
        min_duration_minutes: bound.low,
        max_duration_minutes: bound.high,
    }
}
