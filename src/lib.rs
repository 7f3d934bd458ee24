pub mod config;
pub mod geocoder;
pub mod mapper;
pub mod service;

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Earth radius used by every distance computation, in kilometres.
///
/// This is the polar radius rather than the conventional mean radius. Stored
/// distances and radius queries depend on it, so it must not drift.
pub const EARTH_RADIUS_KM: f64 = 6356.7523;

/// A location on the sphere, in degrees.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Self {
        Point { lat, lng }
    }

    /// Haversine distance to `other` in kilometres.
    pub fn great_circle_distance(&self, other: &Point) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        // rounding can push `a` past 1 for near-antipodal pairs
        let a = a.min(1.0);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }

    /// Destination reached by travelling `distance_km` from this point along
    /// the initial compass `bearing` (degrees clockwise from north).
    pub fn point_at_distance_and_bearing(&self, distance_km: f64, bearing: f64) -> Point {
        let delta = distance_km / EARTH_RADIUS_KM;
        let theta = bearing.to_radians();
        let lat1 = self.lat.to_radians();
        let lng1 = self.lng.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lng2 = lng1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());
        let lng2 = (lng2 + 3.0 * PI).rem_euclid(2.0 * PI) - PI;

        Point {
            lat: lat2.to_degrees(),
            lng: wrap_longitude(lng2.to_degrees()),
        }
    }
}

/// Maps any longitude in degrees onto (-180, 180]; -180 becomes 180.
fn wrap_longitude(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 {
        180.0
    } else {
        wrapped
    }
}
