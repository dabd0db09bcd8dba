//! Pickup hot spots: clustered pickup locations with resolved addresses.

use serde::Serialize;
use tracing::info;

use crate::cluster::{ClusterParams, fit};
use crate::error::{LookupError, Result};
use crate::geocode::ReverseGeocoder;
use crate::views::{PickupView, TripEndView};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotSpot {
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub address: String,
    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotSpotReport {
    pub hot_spots: Vec<HotSpot>,
    /// Hot spot index of every pickup, in record order.
    pub labels: Vec<usize>,
}

/// Clusters all pickups and geocodes each centroid, one request at a time.
///
/// # Errors
///
/// Returns [`crate::Error::Input`] for an empty dataset or invalid `params`,
/// and [`crate::Error::Lookup`] naming the first centroid whose address could
/// not be resolved. No partial report is returned.
pub async fn find_hot_spots<G>(
    pickups: PickupView<'_>,
    params: &ClusterParams,
    geocoder: &G,
) -> Result<HotSpotReport>
where
    G: ReverseGeocoder + ?Sized,
{
    let model = fit(&pickups.positions(), params)?;
    let counts = model.member_counts();

    let mut hot_spots = Vec::with_capacity(model.centroids.len());
    for (index, (centre, member_count)) in model.centroids.iter().zip(counts).enumerate() {
        let address = geocoder
            .lookup(centre.lat, centre.lon)
            .await
            .map_err(|source| LookupError::Centroid {
                index,
                lat: centre.lat,
                lon: centre.lon,
                source: Box::new(source),
            })?;

        hot_spots.push(HotSpot {
            centroid_lat: centre.lat,
            centroid_lon: centre.lon,
            address,
            member_count,
        });
    }

    info!(k = hot_spots.len(), inertia = model.inertia, "Hot spots resolved");

    Ok(HotSpotReport {
        hot_spots,
        labels: model.labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::geocode::stub::CountingGeocoder;
    use crate::model::fixtures::{dataset, trip};

    fn spread_dataset() -> crate::model::Dataset {
        let records = (0..12)
            .map(|i| {
                let mut t = trip(i, "2016-01-01 08:00:00", 600);
                t.pickup_lat = 30.0 + (i % 3) as f64;
                t.pickup_lon = 114.0 + (i % 3) as f64 * 0.5;
                t
            })
            .collect();
        dataset(records)
    }

    #[tokio::test]
    async fn test_one_address_per_centroid() {
        let ds = spread_dataset();
        let geocoder = CountingGeocoder::default();
        let report = find_hot_spots(PickupView(&ds), &ClusterParams::new(3).with_seed(11), &geocoder)
            .await
            .unwrap();

        assert_eq!(report.hot_spots.len(), 3);
        assert_eq!(report.labels.len(), 12);
        assert!(report.labels.iter().all(|&l| l < 3));
        assert_eq!(geocoder.calls(), 3);
        assert_eq!(report.hot_spots.iter().map(|h| h.member_count).sum::<usize>(), 12);
        assert!(report.hot_spots.iter().all(|h| h.address.starts_with("near ")));
    }

    #[tokio::test]
    async fn test_lookup_failure_names_centroid() {
        let ds = spread_dataset();
        let geocoder = CountingGeocoder::failing_at(1);
        let result = find_hot_spots(PickupView(&ds), &ClusterParams::new(3).with_seed(11), &geocoder).await;

        match result {
            Err(Error::Lookup(LookupError::Centroid { index, .. })) => assert_eq!(index, 1),
            other => panic!("expected centroid lookup error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_dataset_is_input_error() {
        let ds = dataset(vec![]);
        let result = find_hot_spots(PickupView(&ds), &ClusterParams::new(3), &CountingGeocoder::default()).await;
        assert!(matches!(result, Err(Error::Input(_))));
    }
}
