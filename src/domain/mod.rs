pub mod address;
pub mod coordinate;
pub mod poi;

pub use address::AddressRecord;
pub use coordinate::{Coordinate, PositionSample};
pub use poi::PointOfInterest;
