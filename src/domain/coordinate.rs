use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean earth radius in meters for the spherical approximation
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Approximate great-circle distance to `other` in meters
    ///
    /// Small-angle form on a spherical earth:
    /// - x = Δlat² + cos(lat1) * cos(lat2) * Δlon²
    /// - d = R * sqrt(x)
    ///
    /// Good to well under a meter at the few-hundred-meter scale POI searches
    /// work at. Symmetric in its arguments and zero for identical points.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let x = d_lat * d_lat + lat1.cos() * lat2.cos() * d_lon * d_lon;
        EARTH_RADIUS_M * x.sqrt()
    }
}

/// One position fix as reported by a location platform
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSample {
    pub coordinate: Coordinate,
    /// Radius of uncertainty in meters
    pub accuracy_m: f64,
    pub altitude_m: Option<f64>,
    pub heading_deg: Option<f64>,
    pub speed_mps: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    /// A fix with only a coordinate and accuracy, captured now
    pub fn at(coordinate: Coordinate, accuracy_m: f64) -> Self {
        Self {
            coordinate,
            accuracy_m,
            altitude_m: None,
            heading_deg: None,
            speed_mps: None,
            timestamp: Utc::now(),
        }
    }
}
