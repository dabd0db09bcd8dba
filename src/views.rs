//! Typed projections of one end of each trip.

use serde::Serialize;

use crate::model::{Dataset, TripRecord};

/// A geographic point as `(lat, lon)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// One end (pickup or dropoff) of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Endpoint<'a> {
    pub id: i64,
    pub time: &'a str,
    pub position: LatLon,
    pub duration_seconds: u64,
}

pub trait TripEndView<'a> {
    fn project(record: &'a TripRecord) -> Endpoint<'a>;

    fn dataset(&self) -> &'a Dataset;

    fn endpoints(&self) -> impl Iterator<Item = Endpoint<'a>> {
        self.dataset().records.iter().map(Self::project)
    }

    fn positions(&self) -> Vec<LatLon> {
        self.endpoints().map(|e| e.position).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PickupView<'a>(pub &'a Dataset);

#[derive(Debug, Clone, Copy)]
pub struct DropoffView<'a>(pub &'a Dataset);

impl<'a> TripEndView<'a> for PickupView<'a> {
    fn project(r: &'a TripRecord) -> Endpoint<'a> {
        Endpoint {
            id: r.id,
            time: &r.pickup_time,
            position: LatLon {
                lat: r.pickup_lat,
                lon: r.pickup_lon,
            },
            duration_seconds: r.duration_seconds,
        }
    }

    fn dataset(&self) -> &'a Dataset {
        self.0
    }
}

impl<'a> TripEndView<'a> for DropoffView<'a> {
    fn project(r: &'a TripRecord) -> Endpoint<'a> {
        Endpoint {
            id: r.id,
            time: &r.dropoff_time,
            position: LatLon {
                lat: r.dropoff_lat,
                lon: r.dropoff_lon,
            },
            duration_seconds: r.duration_seconds,
        }
    }

    fn dataset(&self) -> &'a Dataset {
        self.0
    }
}

/// Mean coordinate of a set of points, used to centre a map.
pub fn map_centre(points: &[LatLon]) -> Option<LatLon> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    Some(LatLon {
        lat: points.iter().map(|p| p.lat).sum::<f64>() / n,
        lon: points.iter().map(|p| p.lon).sum::<f64>() / n,
    })
}
