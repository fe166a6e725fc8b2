pub mod http;
pub mod nominatim;
pub mod overpass;

pub use http::{RawResponse, TimedRequest, fetch_with_deadline};
pub use nominatim::{GeocodingClient, GeocodingEndpoint, GeocodingSettings};
pub use overpass::{PoiClient, PoiSettings};
