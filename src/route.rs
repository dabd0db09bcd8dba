//! Pickup-to-dropoff segments for selected taxis.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::geocode::ReverseGeocoder;
use crate::model::Dataset;
use crate::views::LatLon;

/// Taxis shown when the user has not picked any.
pub const DEFAULT_SELECTION: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSegment {
    pub id: i64,
    pub pickup_time: String,
    pub start: LatLon,
    pub end: LatLon,
    pub duration_minutes: u64,
    pub start_address: String,
    pub end_address: String,
}

pub fn default_route_selection(dataset: &Dataset) -> Vec<i64> {
    dataset
        .taxi_ids()
        .into_iter()
        .take(DEFAULT_SELECTION)
        .collect()
}

/// Builds one segment per trip of the selected taxis, in record order, with
/// both ends geocoded.
///
/// # Errors
///
/// Returns [`Error::Input`] for an empty selection and [`Error::Lookup`] if
/// any endpoint cannot be geocoded.
#[tracing::instrument(skip(dataset, geocoder), fields(selected = ids.len()))]
pub async fn taxi_routes<G>(dataset: &Dataset, ids: &[i64], geocoder: &G) -> Result<Vec<RouteSegment>>
where
    G: ReverseGeocoder + ?Sized,
{
    if ids.is_empty() {
        return Err(Error::input("select at least one taxi"));
    }

    let mut segments = Vec::new();
    for record in dataset.records.iter().filter(|r| ids.contains(&r.id)) {
        let start = LatLon {
            lat: record.pickup_lat,
            lon: record.pickup_lon,
        };
        let end = LatLon {
            lat: record.dropoff_lat,
            lon: record.dropoff_lon,
        };
        let start_address = geocoder.lookup(start.lat, start.lon).await?;
        let end_address = geocoder.lookup(end.lat, end.lon).await?;

        segments.push(RouteSegment {
            id: record.id,
            pickup_time: record.pickup_time.clone(),
            start,
            end,
            duration_minutes: record.duration_minutes(),
            start_address,
            end_address,
        });
    }

    tracing::info!(segments = segments.len(), "Routes built");
    Ok(segments)
}
