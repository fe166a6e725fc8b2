use super::{LocationPlatform, OnPosition, OnPositionError, PositionOptions};
use crate::domain::{Coordinate, PositionSample};

/// Reports a preconfigured coordinate, e.g. from `--lat`/`--lon`
#[derive(Debug, Clone, Copy)]
pub struct FixedPlatform {
    coordinate: Coordinate,
}

impl FixedPlatform {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl LocationPlatform for FixedPlatform {
    fn get_current_position(
        &self,
        on_position: OnPosition,
        _on_error: OnPositionError,
        _options: &PositionOptions,
    ) {
        // Exact by definition; the timestamp is when it was asked for
        on_position(PositionSample::at(self.coordinate, 0.0));
    }
}
