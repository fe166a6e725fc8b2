use serde::Serialize;

use super::Coordinate;

/// A named point feature near the search origin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointOfInterest {
    pub name: String,
    /// Value of the first matching category tag (e.g. `cafe` for `amenity=cafe`)
    pub category: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Distance from the origin, rounded to whole meters
    pub distance_m: u64,
}

impl PointOfInterest {
    pub fn location(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}
