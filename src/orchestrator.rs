//! Runs one locate → address → POI pass and keeps the three panels honest.
//!
//! Stage flow:
//! ```text
//! Idle -> Locating -> Failed                      (terminal, lookups never start)
//!                  -> Acquired -> address lookup  (InProgress -> Succeeded | Failed)
//!                              -> POI lookup      (Skipped | InProgress -> Succeeded | Failed)
//! ```
//! The two lookups run one after the other and cannot affect each other's
//! outcome. Every panel ends on final text.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::api::{GeocodingClient, PoiClient};
use crate::domain::PositionSample;
use crate::locate::{LocationPlatform, PositionOptions, acquire_position};
use crate::surface::Surface;

pub const LOCATING: &str = "Requesting location...";
pub const GEOCODING: &str = "Reverse geocoding (Nominatim)...";
pub const SEARCHING_POI: &str = "Searching nearby POIs...";
pub const ADDRESS_FAILED: &str = "Address lookup failed (public service unstable)";
pub const POI_FAILED: &str = "POI lookup failed (public service unstable)";
pub const POI_DISABLED: &str = "POI lookup disabled";
pub const ADDRESS_NOT_RESOLVED: &str = "Not resolved";
pub const POI_NOT_QUERIED: &str = "Not queried";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStage {
    Idle,
    Locating,
    Acquired,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    /// Never started because the position was not acquired
    NotAttempted,
    /// Turned off by configuration
    Skipped,
    InProgress,
    Succeeded,
    Failed,
}

/// Where each stage ended up after a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub position: PositionStage,
    pub address: LookupStage,
    pub poi: LookupStage,
    pub sample: Option<PositionSample>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            position: PositionStage::Idle,
            address: LookupStage::NotAttempted,
            poi: LookupStage::NotAttempted,
            sample: None,
        }
    }
}

/// The three panels, each written only by its own stage
pub struct Surfaces<'a> {
    pub position: &'a mut dyn Surface,
    pub address: &'a mut dyn Surface,
    pub poi: &'a mut dyn Surface,
}

#[derive(Debug, Serialize)]
struct PositionPanel {
    lat: f64,
    lng: f64,
    accuracy_m: f64,
    altitude_m: Option<f64>,
    heading_deg: Option<f64>,
    speed_mps: Option<f64>,
    timestamp: String,
}

impl From<&PositionSample> for PositionPanel {
    fn from(sample: &PositionSample) -> Self {
        Self {
            lat: sample.coordinate.latitude,
            lng: sample.coordinate.longitude,
            accuracy_m: sample.accuracy_m,
            altitude_m: sample.altitude_m,
            heading_deg: sample.heading_deg,
            speed_mps: sample.speed_mps,
            timestamp: iso_timestamp(sample.timestamp),
        }
    }
}

fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Pretty JSON with two-space indentation
pub fn fmt_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unrenderable: {e}>"))
}

pub struct Orchestrator {
    geocoder: GeocodingClient,
    /// `None` when POI lookup is disabled
    poi: Option<PoiClient>,
    options: PositionOptions,
}

impl Orchestrator {
    pub fn new(
        geocoder: GeocodingClient,
        poi: Option<PoiClient>,
        options: PositionOptions,
    ) -> Self {
        Self {
            geocoder,
            poi,
            options,
        }
    }

    /// Run every stage once, writing each outcome to its panel.
    ///
    /// Never fails: stage errors are logged and rendered, and the returned
    /// report says how far the run got.
    pub async fn run(
        &self,
        platform: Option<&dyn LocationPlatform>,
        surfaces: &mut Surfaces<'_>,
    ) -> RunReport {
        let mut report = RunReport::new();

        report.position = PositionStage::Locating;
        surfaces.position.pending(LOCATING);

        let sample = match acquire_position(platform, self.options).await {
            Ok(sample) => sample,
            Err(err) => {
                tracing::warn!(error = %err, "position acquisition failed");
                report.position = PositionStage::Failed;
                surfaces.position.show(&format!("Location failed: {err}"));
                surfaces.address.show(ADDRESS_NOT_RESOLVED);
                surfaces.poi.show(POI_NOT_QUERIED);
                return report;
            }
        };

        let origin = sample.coordinate;
        tracing::info!(
            lat = origin.latitude,
            lon = origin.longitude,
            accuracy_m = sample.accuracy_m,
            "position acquired"
        );
        report.position = PositionStage::Acquired;
        surfaces.position.show(&fmt_json(&PositionPanel::from(&sample)));
        report.sample = Some(sample);

        report.address = LookupStage::InProgress;
        surfaces.address.pending(GEOCODING);
        match self.geocoder.reverse(origin).await {
            Ok(address) => {
                tracing::info!(display_name = ?address.display_name, "address resolved");
                report.address = LookupStage::Succeeded;
                surfaces.address.show(&fmt_json(&address));
            }
            Err(err) => {
                tracing::warn!(error = %err, "address lookup failed");
                report.address = LookupStage::Failed;
                surfaces.address.show(ADDRESS_FAILED);
            }
        }

        let Some(poi) = &self.poi else {
            report.poi = LookupStage::Skipped;
            surfaces.poi.show(POI_DISABLED);
            return report;
        };

        report.poi = LookupStage::InProgress;
        surfaces.poi.pending(SEARCHING_POI);
        match poi.nearby(origin).await {
            Ok(points) => {
                tracing::info!(
                    count = points.len(),
                    radius_m = poi.settings().radius_m,
                    "nearby POIs found"
                );
                report.poi = LookupStage::Succeeded;
                surfaces.poi.show(&fmt_json(&points));
            }
            Err(err) => {
                tracing::warn!(error = %err, "POI lookup failed");
                report.poi = LookupStage::Failed;
                surfaces.poi.show(POI_FAILED);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Coordinate;
    use chrono::TimeZone;

    #[test]
    fn test_position_panel_shape() {
        let mut sample = PositionSample::at(Coordinate::new(31.2304, 121.4737), 35.0);
        sample.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fmt_json(&PositionPanel::from(&sample))).unwrap();

        assert_eq!(json["lat"], 31.2304);
        assert_eq!(json["lng"], 121.4737);
        assert_eq!(json["accuracy_m"], 35.0);
        assert!(json["altitude_m"].is_null());
        assert_eq!(json["timestamp"], "2024-05-01T08:30:00.000Z");
    }

    #[test]
    fn test_fmt_json_indents_two_spaces() {
        let text = fmt_json(&serde_json::json!({"a": 1}));
        assert_eq!(text, "{\n  \"a\": 1\n}");
    }
}
